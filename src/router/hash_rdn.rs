//! Hash-on-RDN (§4.B.1): stateless, deterministic, safe under any entry arrival order.

use super::{fnv1a32, RoutingContext};
use crate::dn::Rdn;

pub struct HashRdn {
    pub(super) ctx: RoutingContext,
}

impl HashRdn {
    pub fn new(ctx: RoutingContext) -> Self {
        HashRdn { ctx }
    }

    pub(super) fn compute(&self, rdn: &Rdn) -> u32 {
        hash_rdn_mod(rdn, self.ctx.num_shards)
    }
}

/// Shared by the Filter strategy's no-match fallback (§4.B.4), which is hash-on-RDN with `N = k`.
pub(crate) fn hash_rdn_mod(rdn: &Rdn, num_shards: u32) -> u32 {
    fnv1a32(rdn.to_string().as_bytes()) % num_shards
}
