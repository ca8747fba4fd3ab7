//! Bounded, insertion-ordered memoization for matcher results.
//!
//! When full, the oldest quarter of the entries is evicted before the new entry
//! goes in. Eviction order is deterministic (insertion order), but nothing may
//! depend on it: the cache only ever saves recomputation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Maximum number of cached results per matcher.
pub(crate) const MEMO_CAPACITY: usize = 1000;

/// Divisor for the eviction batch: `capacity / 4` entries are dropped on overflow.
const EVICTION_DIVISOR: usize = 4;

/// Cached outcome of one match: `Some(groups)` on success, `None` on failure.
pub(crate) type Outcome = Option<Vec<String>>;

#[derive(Debug, Clone)]
pub(crate) struct MemoCache {
    capacity: usize,
    entries: HashMap<Arc<str>, Outcome>,
    /// The same keys as `entries`, oldest first.
    order: VecDeque<Arc<str>>,
}

impl Default for MemoCache {
    fn default() -> Self {
        Self::with_capacity(MEMO_CAPACITY)
    }
}

impl MemoCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Outcome> {
        self.entries.get(key)
    }

    pub(crate) fn insert(&mut self, key: String, outcome: Outcome) {
        if let Some(slot) = self.entries.get_mut(key.as_str()) {
            *slot = outcome;
            return;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        let key: Arc<str> = key.into();
        self.order.push_back(Arc::clone(&key));
        self.entries.insert(key, outcome);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_oldest(&mut self) {
        let batch = (self.capacity / EVICTION_DIVISOR).max(1);
        for key in self.order.drain(..batch.min(self.order.len())) {
            self.entries.remove(&*key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_insert() {
        let mut cache = MemoCache::default();
        cache.insert("Acme.Util".into(), Some(vec!["Acme".into()]));
        cache.insert("Other".into(), None);

        assert_eq!(cache.get("Acme.Util"), Some(&Some(vec!["Acme".into()])));
        assert_eq!(cache.get("Other"), Some(&None));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_overflow_evicts_oldest_quarter() {
        let mut cache = MemoCache::with_capacity(8);
        for i in 0..8 {
            cache.insert(format!("k{i}"), None);
        }
        assert_eq!(cache.len(), 8);

        cache.insert("k8".into(), None);
        // 8 / 4 = 2 oldest dropped, then the new entry added
        assert_eq!(cache.len(), 7);
        assert!(cache.get("k0").is_none());
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k8").is_some());
    }

    #[test]
    fn test_reinsert_does_not_grow() {
        let mut cache = MemoCache::with_capacity(4);
        cache.insert("a".into(), None);
        cache.insert("a".into(), Some(vec![]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(&Some(vec![])));
    }

    #[test]
    fn test_default_capacity_bound() {
        let mut cache = MemoCache::default();
        for i in 0..(MEMO_CAPACITY * 3) {
            cache.insert(i.to_string(), None);
            assert!(cache.len() <= MEMO_CAPACITY);
        }
    }

    #[test]
    fn test_index_and_order_share_keys() {
        let mut cache = MemoCache::with_capacity(4);
        cache.insert("Acme.Util".into(), None);

        let (key, _) = cache.entries.get_key_value("Acme.Util").unwrap();
        assert!(Arc::ptr_eq(key, &cache.order[0]));
        assert_eq!(Arc::strong_count(key), 2);
    }
}
