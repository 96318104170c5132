//! Property tests for cache keys, freshness and feed shaping.

use std::collections::BTreeMap;

use chrono::DateTime;
use folio_activity::{Activity, ActivityId, CacheEntry, TtlCache, cache_key, newest_first};
use proptest::prelude::*;

fn activity(id: usize, secs: i64) -> Option<Activity> {
    Some(Activity {
        id: ActivityId::from(id.to_string()),
        kind: "commit".to_string(),
        description: String::new(),
        project_name: Some("folio".to_string()),
        timestamp: DateTime::from_timestamp(secs, 0)?,
        metadata: None,
        extra: serde_json::Map::new(),
    })
}

proptest! {
    #[test]
    fn test_key_independent_of_insertion_order(
        entries in prop::collection::vec(("[a-z]{1,6}", 0i64..1_000), 0..12),
    ) {
        let forward: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
            .collect();
        let backward: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
            .collect();
        // Duplicate keys resolve differently per direction; compare on unique ones.
        let unique: BTreeMap<&String, i64> = entries.iter().map(|(k, v)| (k, *v)).collect();
        prop_assume!(unique.len() == entries.len());

        let a = cache_key(&forward).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let b = cache_key(&backward).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(a, b);
    }

    #[test]
    fn test_cache_keeps_latest_fetch(
        stamps in prop::collection::vec(0u64..10_000, 1..40),
    ) {
        let mut cache = TtlCache::new(1_000);
        for (i, stamp) in stamps.iter().enumerate() {
            cache.insert("k".to_string(), CacheEntry::new(i, *stamp));
        }
        let latest = stamps.iter().copied().max().unwrap_or_default();
        let entry = cache.get("k").ok_or_else(|| TestCaseError::fail("entry missing"))?;
        prop_assert_eq!(entry.fetched_at_ms, latest);
    }

    #[test]
    fn test_freshness_matches_ttl(
        fetched in 0u64..1_000_000,
        age in 0u64..100_000,
        ttl in 1u64..60_000,
    ) {
        let entry = CacheEntry::new((), fetched);
        prop_assert_eq!(entry.is_fresh(fetched + age, ttl), age < ttl);
    }

    #[test]
    fn test_shaping_sorts_and_bounds(
        secs in prop::collection::vec(0i64..2_000_000_000, 0..30),
        limit in 0usize..40,
    ) {
        let activities: Vec<Activity> = secs
            .iter()
            .enumerate()
            .filter_map(|(id, s)| activity(id, *s))
            .collect();
        let total = activities.len();
        let shaped = newest_first(activities, limit);

        prop_assert_eq!(shaped.len(), total.min(limit));
        let sorted = shaped.windows(2).all(|pair| match pair {
            [a, b] => a.timestamp >= b.timestamp,
            _ => true,
        });
        prop_assert!(sorted, "activities are not newest first");
    }
}
