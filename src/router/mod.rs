//! Router strategies (component B) and the outer decision logic shared by all four of them
//! (§4.B). The four strategies are modeled as variants of one enum rather than as trait objects,
//! so the per-entry hot loop dispatches once via `match` instead of through a vtable — the same
//! "dispatch once at stream start" shape the teacher uses for its format parsers
//! (`parser::format::parser_for(Format) -> Box<dyn Parser>` picks the parser once; the hot loop
//! inside each parser never re-dispatches).

pub mod fewest_entries;
pub mod filter_strategy;
pub mod hash_attribute;
pub mod hash_rdn;

use crate::dn::{Dn, Rdn};
use crate::entry::Entry;
use crate::parent_map::ParentMap;
use std::collections::BTreeSet;

/// A target shard: either one of the `N` numbered shards, or the dedicated shard for entries
/// outside the split base. The `errors` shard is not modeled here; it is a dispatcher-only
/// concept applied to malformed records and routing failures, not a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shard {
    Numbered(u32),
    OutsideDedicated,
}

impl Shard {
    /// The on-disk filename suffix for this shard, e.g. `.set3` or `.outside-split-base-dn`.
    pub fn suffix(&self) -> String {
        match self {
            Shard::Numbered(n) => format!(".set{}", n + 1),
            Shard::OutsideDedicated => ".outside-split-base-dn".to_string(),
        }
    }
}

pub type ShardSet = BTreeSet<Shard>;

/// FNV-1a/32, pinned per the design note on hash stability: a non-cryptographic, locale-independent
/// hash whose output must stay identical across process runs and thread counts.
pub(crate) fn fnv1a32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c9dc5;
    const PRIME: u32 = 0x0100_0193;
    let mut hash = OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// The outcome of routing a single entry.
#[derive(Debug, Clone)]
pub enum Decision {
    /// A resolved shard-set (possibly empty, meaning "exclude this entry").
    Shards(ShardSet),
    /// The entry is strictly below the split base, is not using the flat-DIT fallback, and its
    /// parent was not yet present in the parent map when this decision was made. The dispatcher
    /// retries once at drain time (§4.D, §4.E).
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutsideHandling {
    AllSets,
    Dedicated,
    Omit,
}

/// Parameters shared by every strategy: the split base, the shard count, and how to handle
/// entries at or above the split base.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    pub split_base: Dn,
    pub num_shards: u32,
    pub outside: OutsideHandling,
}

impl RoutingContext {
    fn outside_decision(&self) -> Decision {
        match self.outside {
            OutsideHandling::AllSets => {
                Decision::Shards((0..self.num_shards).map(Shard::Numbered).collect())
            }
            OutsideHandling::Dedicated => {
                Decision::Shards(std::iter::once(Shard::OutsideDedicated).collect())
            }
            OutsideHandling::Omit => Decision::Shards(ShardSet::new()),
        }
    }
}

/// The four routing strategies (§4.B.1-4).
pub enum Strategy {
    HashRdn(hash_rdn::HashRdn),
    HashAttribute(hash_attribute::HashAttribute),
    FewestEntries(fewest_entries::FewestEntries),
    Filter(filter_strategy::FilterStrategy),
}

impl Strategy {
    pub fn context(&self) -> &RoutingContext {
        match self {
            Strategy::HashRdn(s) => &s.ctx,
            Strategy::HashAttribute(s) => &s.ctx,
            Strategy::FewestEntries(s) => &s.ctx,
            Strategy::Filter(s) => &s.ctx,
        }
    }

    /// Whether the strategy needs the one-level-deeper flat-DIT fallback instead of parent-map
    /// lookups. Hash-on-RDN never needs parent tracking at all (§4.B.1), so this flag is
    /// meaningless for it; it is still "stateless-safe" either way.
    fn assume_flat_dit(&self) -> bool {
        match self {
            Strategy::HashRdn(_) => true,
            Strategy::HashAttribute(s) => s.assume_flat_dit,
            Strategy::FewestEntries(s) => s.assume_flat_dit,
            Strategy::Filter(s) => s.assume_flat_dit,
        }
    }

    fn needs_parent_map(&self) -> bool {
        !matches!(self, Strategy::HashRdn(_))
    }

    /// Computes the 0-based shard index for an entry known to sit at the one-level-below-base
    /// position (or, under the flat-DIT fallback, treated as if it did). `rdn` is the RDN at that
    /// position: the entry's own relative component in the normal case, or the ancestor's RDN
    /// under the flat-DIT fallback for a deeper entry. Strategies that look at attribute values
    /// (hash-on-attribute, filter) read them from `entry` itself, since that is the only entry
    /// content available for a fallback-routed descendant.
    fn compute_one_level(&self, entry: &Entry, rdn: &Rdn) -> u32 {
        match self {
            Strategy::HashRdn(s) => s.compute(rdn),
            Strategy::HashAttribute(s) => s.compute(entry, rdn),
            Strategy::FewestEntries(s) => s.compute(),
            Strategy::Filter(s) => s.compute(entry, rdn),
        }
    }

    /// The shared outer decision (§4.B). Re-entrant and side-effect-free except for parent map
    /// writes and (for fewest-entries) the shard counters, matching the translation pipeline's
    /// contract of never mutating the entry and never touching I/O.
    pub fn route(&self, entry: &Entry, parent_map: &ParentMap) -> Decision {
        let ctx = self.context();
        let dn = entry.dn();

        if !dn.is_below(&ctx.split_base) {
            return ctx.outside_decision();
        }

        let depth = dn.rdns().len() - ctx.split_base.rdns().len();
        if depth == 1 {
            let rdn = dn.relative_component(&ctx.split_base).expect("depth == 1");
            let shard = self.compute_one_level(entry, rdn);
            let set: ShardSet = std::iter::once(Shard::Numbered(shard)).collect();
            if self.needs_parent_map() {
                parent_map.insert_if_absent(dn.canonical_key(), set.clone());
            }
            return Decision::Shards(set);
        }

        // depth > 1.
        if self.assume_flat_dit() {
            let ancestor = dn.ancestor_one_below_base(&ctx.split_base);
            let rdn = &ancestor.rdns()[0];
            let shard = self.compute_one_level(entry, rdn);
            return Decision::Shards(std::iter::once(Shard::Numbered(shard)).collect());
        }

        let parent_key = dn
            .parent()
            .expect("depth > 1 implies a non-root DN")
            .canonical_key();
        match parent_map.get(&parent_key) {
            Some(shard_set) => {
                parent_map.insert_if_absent(dn.canonical_key(), shard_set.clone());
                Decision::Shards(shard_set)
            }
            None => Decision::Deferred,
        }
    }
}
