//! Thread-safe DN → shard-set cache (component C). Populated only by strategies that need parent
//! tracking (hash-on-attribute, fewest-entries, filter); hash-on-RDN never touches it.
//!
//! Backed by `dashmap`, the same sharded-lock concurrent map used elsewhere in the retrieval pack
//! for shared state written from many worker threads. `entry().or_insert_with` gives the
//! at-most-one-insert-per-DN guarantee without a separate lock: a racing second writer for the
//! same key observes the first writer's value instead of overwriting it, and readers never see a
//! partially constructed set because the set is built before being handed to the map.

use crate::router::ShardSet;
use dashmap::DashMap;

#[derive(Default)]
pub struct ParentMap {
    inner: DashMap<String, ShardSet>,
}

impl ParentMap {
    pub fn new() -> Self {
        ParentMap {
            inner: DashMap::new(),
        }
    }

    pub fn get(&self, canonical_key: &str) -> Option<ShardSet> {
        self.inner.get(canonical_key).map(|r| r.clone())
    }

    /// Idempotent insert: if another thread already recorded a decision for this DN, that
    /// decision wins and `shard_set` is discarded.
    pub fn insert_if_absent(&self, canonical_key: String, shard_set: ShardSet) {
        self.inner.entry(canonical_key).or_insert(shard_set);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Shard;

    #[test]
    fn first_insert_wins() {
        let map = ParentMap::new();
        let a: ShardSet = std::iter::once(Shard::Numbered(0)).collect();
        let b: ShardSet = std::iter::once(Shard::Numbered(1)).collect();
        map.insert_if_absent("dc=example".to_string(), a.clone());
        map.insert_if_absent("dc=example".to_string(), b);
        assert_eq!(map.get("dc=example").unwrap(), a);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn missing_key_is_none() {
        let map = ParentMap::new();
        assert!(map.get("dc=nowhere").is_none());
    }
}
