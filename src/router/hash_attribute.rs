//! Hash-on-attribute (§4.B.2): hashes the entry's values of a configured attribute, falling back
//! to hash-on-RDN when the attribute is absent.

use super::hash_rdn::hash_rdn_mod;
use super::{fnv1a32, RoutingContext};
use crate::dn::Rdn;
use crate::entry::Entry;

pub struct HashAttribute {
    pub(super) ctx: RoutingContext,
    attribute: String,
    use_all_values: bool,
    pub(super) assume_flat_dit: bool,
}

impl HashAttribute {
    pub fn new(
        ctx: RoutingContext,
        attribute: String,
        use_all_values: bool,
        assume_flat_dit: bool,
    ) -> Self {
        HashAttribute {
            ctx,
            attribute,
            use_all_values,
            assume_flat_dit,
        }
    }

    pub(super) fn compute(&self, entry: &Entry, rdn: &Rdn) -> u32 {
        let values = entry.values(&self.attribute);
        if values.is_empty() {
            return hash_rdn_mod(rdn, self.ctx.num_shards);
        }
        let selected: Vec<&str> = if self.use_all_values {
            values
        } else {
            vec![values[0]]
        };
        // Reserved 0x00 separator between concatenated canonical values, per §4.B.2.
        let joined = selected.join("\u{0}");
        fnv1a32(joined.as_bytes()) % self.ctx.num_shards
    }
}
