//! Fewest-entries (§4.B.3): routes each one-level entry to the currently smallest shard, ties
//! broken by lowest index, then atomically increments that shard's counter.

use super::RoutingContext;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct FewestEntries {
    pub(super) ctx: RoutingContext,
    pub(super) assume_flat_dit: bool,
    counters: Vec<AtomicU64>,
}

impl FewestEntries {
    pub fn new(ctx: RoutingContext, assume_flat_dit: bool) -> Self {
        let counters = (0..ctx.num_shards).map(|_| AtomicU64::new(0)).collect();
        FewestEntries {
            ctx,
            assume_flat_dit,
            counters,
        }
    }

    /// Picks the shard with the smallest current count (ties -> lowest index) and increments it
    /// before returning. The read-then-increment is not a single atomic RMW across all counters,
    /// but two entries racing for the same minimum only cost a one-entry imbalance, which the
    /// balance property (§8) only bounds to <= 1 anyway.
    pub(super) fn compute(&self) -> u32 {
        let mut best_index = 0usize;
        let mut best_value = self.counters[0].load(Ordering::SeqCst);
        for (index, counter) in self.counters.iter().enumerate().skip(1) {
            let value = counter.load(Ordering::SeqCst);
            if value < best_value {
                best_value = value;
                best_index = index;
            }
        }
        self.counters[best_index].fetch_add(1, Ordering::SeqCst);
        best_index as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::entry::Entry;
    use crate::parent_map::ParentMap;
    use crate::router::{Decision, OutsideHandling, Shard, Strategy};
    use pretty_assertions::assert_eq;

    #[test]
    fn scenario_one_from_spec() {
        let ctx = RoutingContext {
            split_base: Dn::parse("ou=People,dc=example,dc=com").unwrap(),
            num_shards: 2,
            outside: OutsideHandling::AllSets,
        };
        let strategy = Strategy::FewestEntries(FewestEntries::new(ctx, false));
        let parent_map = ParentMap::new();

        let top1 = Entry::new(
            Dn::parse("dc=example,dc=com").unwrap(),
            "dc=example,dc=com".to_string(),
            Vec::new(),
        );
        let top2 = Entry::new(
            Dn::parse("ou=People,dc=example,dc=com").unwrap(),
            "ou=People,dc=example,dc=com".to_string(),
            Vec::new(),
        );
        for top in [&top1, &top2] {
            match strategy.route(top, &parent_map) {
                Decision::Shards(set) => assert_eq!(set.len(), 2),
                Decision::Deferred => panic!("outside entries never defer"),
            }
        }

        let alice = Entry::new(
            Dn::parse("uid=alice,ou=People,dc=example,dc=com").unwrap(),
            "uid=alice,ou=People,dc=example,dc=com".to_string(),
            Vec::new(),
        );
        match strategy.route(&alice, &parent_map) {
            Decision::Shards(set) => assert_eq!(set, std::iter::once(Shard::Numbered(0)).collect()),
            Decision::Deferred => panic!("one-level entries never defer"),
        }
    }

    #[test]
    fn balance_after_many_one_level_entries() {
        let ctx = RoutingContext {
            split_base: Dn::parse("ou=People,dc=example,dc=com").unwrap(),
            num_shards: 3,
            outside: OutsideHandling::Omit,
        };
        let strategy = FewestEntries::new(ctx, false);
        let mut counts = vec![0u32; 3];
        for _ in 0..100 {
            let shard = strategy.compute();
            counts[shard as usize] += 1;
        }
        let min = *counts.iter().min().unwrap();
        let max = *counts.iter().max().unwrap();
        assert!(max - min <= 1);
    }
}
