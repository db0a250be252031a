use std::sync::{Arc, Mutex};

use bytes::Bytes;
use larder_observe::{Level, LogSink};

const BUCKET_COUNT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// Payload exceeded the per-element ceiling (or the whole budget); the
    /// cache was left untouched.
    TooLarge,
}

/// One cached response. A live node sits in exactly one hash-bucket chain
/// and at exactly one recency-list position.
struct Node {
    key: String,
    payload: Bytes,
    prev: Option<usize>,
    next: Option<usize>,
    hash_next: Option<usize>,
}

struct CacheState {
    capacity: usize,
    max_element_bytes: usize,
    current_bytes: usize,
    buckets: Vec<Option<usize>>,
    head: Option<usize>,
    tail: Option<usize>,
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
}

/// Thread-safe byte-budget LRU store.
///
/// Every operation holds the single internal mutex for its full duration,
/// so promotions linearize. `get` hands back a refcounted `Bytes` view of
/// the payload; a concurrent eviction releases the cache's reference but
/// never the reader's.
pub struct LruCache {
    state: Mutex<CacheState>,
    sink: Arc<dyn LogSink>,
}

impl LruCache {
    pub fn new(capacity: usize, max_element_bytes: usize, sink: Arc<dyn LogSink>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                capacity,
                max_element_bytes,
                current_bytes: 0,
                buckets: vec![None; BUCKET_COUNT],
                head: None,
                tail: None,
                slots: Vec::new(),
                free: Vec::new(),
            }),
            sink,
        }
    }

    /// Looks up `key`, promoting the entry to the recency head on a hit.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.state.lock().expect("lock poisoned");
        let bucket = bucket_of(key);
        let mut cursor = state.buckets[bucket];
        while let Some(index) = cursor {
            let node = state.node(index);
            let next = node.hash_next;
            if node.key == key {
                let payload = node.payload.clone();
                state.detach(index);
                state.attach_front(index);
                state.assert_consistent();
                drop(state);
                self.sink.log(Level::Info, &format!("cache hit for {key}"));
                return Some(payload);
            }
            cursor = next;
        }
        drop(state);
        self.sink.log(Level::Info, &format!("cache miss for {key}"));
        None
    }

    /// Inserts `payload` under `key`, evicting from the recency tail until
    /// it fits. Oversized payloads are rejected without evicting anything.
    /// Duplicate keys are not collapsed; the newest entry heads the chain.
    pub fn put(&self, key: &str, payload: Bytes) -> PutOutcome {
        let mut state = self.state.lock().expect("lock poisoned");
        if payload.len() > state.max_element_bytes || payload.len() > state.capacity {
            drop(state);
            self.sink.log(
                Level::Warn,
                &format!("item too large to cache ({} bytes)", payload.len()),
            );
            return PutOutcome::TooLarge;
        }

        let mut evicted = Vec::new();
        while state.current_bytes + payload.len() > state.capacity {
            match state.evict_tail() {
                Some(key) => evicted.push((key, state.current_bytes)),
                None => break,
            }
        }

        let size = payload.len();
        let index = state.alloc(Node {
            key: key.to_string(),
            payload,
            prev: None,
            next: None,
            hash_next: None,
        });
        state.attach_front(index);
        let bucket = bucket_of(key);
        let chain_head = state.buckets[bucket];
        state.node_mut(index).hash_next = chain_head;
        state.buckets[bucket] = Some(index);
        state.current_bytes += size;
        let current_bytes = state.current_bytes;
        state.assert_consistent();
        drop(state);

        for (key, remaining) in evicted {
            self.sink.log(
                Level::Info,
                &format!("evicted {key}, cache size now {remaining} bytes"),
            );
        }
        self.sink.log(
            Level::Info,
            &format!("stored {key}, cache size now {current_bytes} bytes"),
        );
        PutOutcome::Stored
    }

    /// Sum of live payload sizes in bytes.
    pub fn current_bytes(&self) -> usize {
        self.state.lock().expect("lock poisoned").current_bytes
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let state = self.state.lock().expect("lock poisoned");
        state.slots.len() - state.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from most recently used to least recently used.
    pub fn recency_keys(&self) -> Vec<String> {
        let state = self.state.lock().expect("lock poisoned");
        let mut keys = Vec::new();
        let mut cursor = state.head;
        while let Some(index) = cursor {
            let node = state.node(index);
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }
}

impl CacheState {
    fn node(&self, index: usize) -> &Node {
        self.slots[index].as_ref().expect("live slot")
    }

    fn node_mut(&mut self, index: usize) -> &mut Node {
        self.slots[index].as_mut().expect("live slot")
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                index
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn detach(&mut self, index: usize) {
        let (prev, next) = {
            let node = self.node(index);
            (node.prev, node.next)
        };
        match prev {
            Some(prev_index) => self.node_mut(prev_index).next = next,
            None => self.head = next,
        }
        match next {
            Some(next_index) => self.node_mut(next_index).prev = prev,
            None => self.tail = prev,
        }
    }

    fn attach_front(&mut self, index: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(index);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(head_index) = old_head {
            self.node_mut(head_index).prev = Some(index);
        }
        self.head = Some(index);
        if self.tail.is_none() {
            self.tail = Some(index);
        }
    }

    /// Removes the least recently used entry, returning its key.
    fn evict_tail(&mut self) -> Option<String> {
        let index = self.tail?;
        self.detach(index);
        self.unlink_bucket(index);
        let node = self.slots[index].take().expect("live slot");
        self.free.push(index);
        self.current_bytes -= node.payload.len();
        Some(node.key)
    }

    fn unlink_bucket(&mut self, index: usize) {
        let bucket = bucket_of(&self.node(index).key);
        let mut cursor = self.buckets[bucket];
        let mut prev: Option<usize> = None;
        while let Some(current) = cursor {
            if current == index {
                let after = self.node(current).hash_next;
                match prev {
                    Some(prev_index) => self.node_mut(prev_index).hash_next = after,
                    None => self.buckets[bucket] = after,
                }
                return;
            }
            prev = Some(current);
            cursor = self.node(current).hash_next;
        }
    }

    fn assert_consistent(&self) {
        if cfg!(debug_assertions) {
            let live = self.slots.len() - self.free.len();
            let mut list_len = 0;
            let mut cursor = self.head;
            while let Some(index) = cursor {
                list_len += 1;
                cursor = self.node(index).next;
            }
            let mut chain_len = 0;
            for bucket in &self.buckets {
                let mut cursor = *bucket;
                while let Some(index) = cursor {
                    chain_len += 1;
                    cursor = self.node(index).hash_next;
                }
            }
            debug_assert_eq!(list_len, live);
            debug_assert_eq!(chain_len, live);
            debug_assert!(self.current_bytes <= self.capacity);
        }
    }
}

fn bucket_of(key: &str) -> usize {
    (djb2(key) % BUCKET_COUNT as u64) as usize
}

fn djb2(key: &str) -> u64 {
    key.bytes()
        .fold(5381_u64, |hash, byte| hash.wrapping_mul(33).wrapping_add(u64::from(byte)))
}
