//! Property-based integration tests for the cache and the rate gate.
//!
//! Time is driven by a `ManualClock`, so every property holds without
//! sleeping.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::json;
use stockpulse_market_data::cache::partition::{STOCK_INFO, SYMBOL_KEYED_PARTITIONS};
use stockpulse_market_data::{CacheStore, ManualClock, SourceDescriptor, SourceRegistry};

// =============================================================================
// Helpers
// =============================================================================

fn cache_with_clock() -> (CacheStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    (CacheStore::with_clock(clock.clone()), clock)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Get(u8),
    Set(u8),
    Delete(u8),
    Advance(u16),
}

fn arb_cache_op() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (0u8..8).prop_map(CacheOp::Get),
        (0u8..8).prop_map(CacheOp::Set),
        (0u8..8).prop_map(CacheOp::Delete),
        (0u16..2000).prop_map(CacheOp::Advance),
    ]
}

fn descriptor(requests_per_minute: u32) -> SourceDescriptor {
    SourceDescriptor {
        name: "gated".to_string(),
        priority: 1,
        enabled: true,
        requests_per_minute,
        last_request_at: None,
        reliability: 0.5,
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// A value is returned before its TTL elapses and absent from then on.
    #[test]
    fn prop_ttl_boundary(ttl_secs in 1u64..10_000, offset_secs in 0u64..20_000) {
        let (cache, clock) = cache_with_clock();
        cache.set_ttl(STOCK_INFO, Duration::from_secs(ttl_secs)).unwrap();
        cache.set(STOCK_INFO, "AAA", json!({"price": 10}), None);

        clock.advance(Duration::from_secs(offset_secs));
        let value = cache.get(STOCK_INFO, "AAA");

        if offset_secs < ttl_secs {
            prop_assert_eq!(value, Some(json!({"price": 10})));
        } else {
            prop_assert_eq!(value, None);
        }
    }

    /// Every get is counted exactly once as a hit or a miss, every set once.
    #[test]
    fn prop_hit_miss_accounting(ops in prop::collection::vec(arb_cache_op(), 0..200)) {
        let (cache, clock) = cache_with_clock();
        let mut gets = 0u64;
        let mut sets = 0u64;

        for op in ops {
            match op {
                CacheOp::Get(k) => {
                    cache.get(STOCK_INFO, &k.to_string());
                    gets += 1;
                }
                CacheOp::Set(k) => {
                    cache.set(STOCK_INFO, &k.to_string(), json!(k), None);
                    sets += 1;
                }
                CacheOp::Delete(k) => {
                    cache.delete(STOCK_INFO, &k.to_string());
                }
                CacheOp::Advance(secs) => clock.advance(Duration::from_secs(secs as u64)),
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits + stats.misses, gets);
        prop_assert_eq!(stats.sets, sets);
    }

    /// `clear_all` always leaves an empty cache.
    #[test]
    fn prop_clear_all_empties(entries in prop::collection::vec((0usize..7, "[A-Z]{1,4}"), 0..50)) {
        let (cache, _clock) = cache_with_clock();
        let partitions = [STOCK_INFO, "price_data", "news", "custom", "x", "y", "z"];
        for (p, key) in &entries {
            cache.set(partitions[*p], key, json!(1), None);
        }

        cache.clear_all();

        prop_assert_eq!(cache.stats().total_entries, 0);
    }

    /// Invalidating one symbol leaves every other symbol in place.
    #[test]
    fn prop_invalidate_related_is_scoped(
        target in "[A-Z]{1,4}",
        others in prop::collection::hash_set("[0-9]{4}", 1..5),
    ) {
        let (cache, _clock) = cache_with_clock();
        for partition in SYMBOL_KEYED_PARTITIONS {
            cache.set(partition, &target, json!("target"), None);
            for other in &others {
                cache.set(partition, other, json!("other"), None);
            }
        }

        cache.invalidate_related(&target);

        for partition in SYMBOL_KEYED_PARTITIONS {
            prop_assert!(cache.get(partition, &target).is_none());
            for other in &others {
                prop_assert!(cache.get(partition, other).is_some());
            }
        }
    }

    /// No rolling 60 second window admits more than the configured quota.
    #[test]
    fn prop_admission_window(
        rpm in 1u32..120,
        steps_ms in prop::collection::vec(0u64..3_000, 1..400),
    ) {
        let clock = Arc::new(ManualClock::default());
        let registry = SourceRegistry::new(vec![descriptor(rpm)], clock.clone());
        let window = Duration::from_secs(60);
        let mut elapsed = Duration::ZERO;
        let mut admitted: VecDeque<Duration> = VecDeque::new();

        for step in steps_ms {
            let step = Duration::from_millis(step);
            clock.advance(step);
            elapsed += step;

            if registry.try_admit("gated").is_admitted() {
                admitted.push_back(elapsed);
            }
            while admitted.front().is_some_and(|t| elapsed - *t >= window) {
                admitted.pop_front();
            }
            prop_assert!(admitted.len() as u32 <= rpm);
        }
    }
}

#[test]
fn concrete_ttl_scenario() {
    let (cache, clock) = cache_with_clock();
    cache.set_ttl(STOCK_INFO, Duration::from_secs(3600)).unwrap();

    cache.set(STOCK_INFO, "AAA", json!({"price": 10}), None);

    clock.advance(Duration::from_secs(30 * 60));
    assert_eq!(cache.get(STOCK_INFO, "AAA"), Some(json!({"price": 10})));
    assert_eq!(cache.stats().hits, 1);

    clock.advance(Duration::from_secs(31 * 60));
    assert_eq!(cache.get(STOCK_INFO, "AAA"), None);
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.misses, 1);
}
