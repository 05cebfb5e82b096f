//! Filter strategy (§4.B.4): the first matching filter in an ordered list selects the shard; no
//! match falls back to hash-on-RDN with `N = k`.

use super::hash_rdn::hash_rdn_mod;
use super::RoutingContext;
use crate::dn::Rdn;
use crate::entry::Entry;
use crate::filter::Filter;
use crate::schema::Schema;
use std::sync::Arc;

pub struct FilterStrategy {
    pub(super) ctx: RoutingContext,
    filters: Vec<Filter>,
    schema: Arc<Schema>,
    pub(super) assume_flat_dit: bool,
}

impl FilterStrategy {
    pub fn new(
        ctx: RoutingContext,
        filters: Vec<Filter>,
        schema: Arc<Schema>,
        assume_flat_dit: bool,
    ) -> Self {
        FilterStrategy {
            ctx,
            filters,
            schema,
            assume_flat_dit,
        }
    }

    pub(super) fn compute(&self, entry: &Entry, rdn: &Rdn) -> u32 {
        for (index, filter) in self.filters.iter().enumerate() {
            if filter.evaluate(entry, &self.schema) {
                return index as u32;
            }
        }
        hash_rdn_mod(rdn, self.filters.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::parent_map::ParentMap;
    use crate::router::{Decision, OutsideHandling, Shard, Strategy};

    fn make_entry(dn: &str, attrs: &[(&str, &str)]) -> Entry {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
            .collect();
        Entry::new(Dn::parse(dn).unwrap(), dn.to_string(), attrs)
    }

    fn ctx() -> RoutingContext {
        RoutingContext {
            split_base: Dn::parse("ou=People,dc=example,dc=com").unwrap(),
            num_shards: 3,
            outside: OutsideHandling::Omit,
        }
    }

    #[test]
    fn first_matching_filter_wins() {
        let filters = vec![
            Filter::parse("(ou=Eng)").unwrap(),
            Filter::parse("(ou=Sales)").unwrap(),
            Filter::parse("(ou=Support)").unwrap(),
        ];
        let strategy = Strategy::Filter(FilterStrategy::new(
            ctx(),
            filters,
            Arc::new(Schema::empty()),
            false,
        ));
        let parent_map = ParentMap::new();
        let e = make_entry(
            "uid=bob,ou=People,dc=example,dc=com",
            &[("ou", "Sales")],
        );
        match strategy.route(&e, &parent_map) {
            Decision::Shards(set) => assert_eq!(set, std::iter::once(Shard::Numbered(1)).collect()),
            Decision::Deferred => panic!("one-level entries never defer"),
        }
    }

    #[test]
    fn monotonicity_when_filters_reordered() {
        // Scenario from §8: reordering F1..Fk reroutes an entry matching a single, unique filter
        // to the corresponding reordered index.
        let original = vec![
            Filter::parse("(ou=Eng)").unwrap(),
            Filter::parse("(ou=Sales)").unwrap(),
        ];
        let reordered = vec![
            Filter::parse("(ou=Sales)").unwrap(),
            Filter::parse("(ou=Eng)").unwrap(),
        ];
        let schema = Arc::new(Schema::empty());
        let s1 = Strategy::Filter(FilterStrategy::new(ctx(), original, schema.clone(), false));
        let s2 = Strategy::Filter(FilterStrategy::new(ctx(), reordered, schema, false));
        let e = make_entry("uid=bob,ou=People,dc=example,dc=com", &[("ou", "Eng")]);

        let shard1 = match s1.route(&e, &ParentMap::new()) {
            Decision::Shards(set) => set,
            _ => panic!(),
        };
        let shard2 = match s2.route(&e, &ParentMap::new()) {
            Decision::Shards(set) => set,
            _ => panic!(),
        };
        assert_eq!(shard1, std::iter::once(Shard::Numbered(0)).collect());
        assert_eq!(shard2, std::iter::once(Shard::Numbered(1)).collect());
    }

    #[test]
    fn no_match_falls_back_to_hash_on_rdn() {
        let filters = vec![
            Filter::parse("(ou=Eng)").unwrap(),
            Filter::parse("(ou=Sales)").unwrap(),
        ];
        let strategy = Strategy::Filter(FilterStrategy::new(
            ctx(),
            filters,
            Arc::new(Schema::empty()),
            false,
        ));
        let e = make_entry("uid=bob,ou=People,dc=example,dc=com", &[("ou", "Support")]);
        let decision = strategy.route(&e, &ParentMap::new());
        assert!(matches!(decision, Decision::Shards(_)));
    }
}
