use std::num::NonZeroUsize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lru::LruCache;

use crate::client::FilterState;

/// Entries are bucketed by `unix_seconds / ttl_seconds`, so a new bucket
/// starts a fresh key even before the old entry expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub filter: FilterState,
    pub bucket: u64,
}

impl CacheKey {
    pub fn at(filter: FilterState, now: SystemTime, ttl: Duration) -> Self {
        let secs = now
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self {
            filter,
            bucket: secs / ttl.as_secs().max(1),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedResult<V> {
    value: V,
    stored_at: SystemTime,
}

impl<V> CachedResult<V> {
    fn is_fresh(&self, ttl: Duration, now: SystemTime) -> bool {
        now.duration_since(self.stored_at)
            .map(|age| age < ttl)
            .unwrap_or(true)
    }
}

/// Bounded map of recent pipeline results. Not synchronised; the owner wraps
/// it in a lock.
pub struct ResultCache<V> {
    entries: LruCache<CacheKey, CachedResult<V>>,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get_at(&mut self, filter: FilterState, now: SystemTime) -> Option<V> {
        let key = CacheKey::at(filter, now, self.ttl);
        let fresh = self.entries.get(&key)?.is_fresh(self.ttl, now);
        if !fresh {
            self.entries.pop(&key);
            return None;
        }
        self.entries.get(&key).map(|entry| entry.value.clone())
    }

    pub fn put_at(&mut self, filter: FilterState, value: V, now: SystemTime) {
        if self.ttl.is_zero() {
            return;
        }
        let key = CacheKey::at(filter, now, self.ttl);
        self.entries.put(
            key,
            CachedResult {
                value,
                stored_at: now,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn hit_within_bucket() {
        let mut cache = ResultCache::new(4, Duration::from_secs(300));
        cache.put_at(FilterState::Open, 7, at(600));
        assert_eq!(cache.get_at(FilterState::Open, at(899)), Some(7));
        assert_eq!(cache.get_at(FilterState::Closed, at(899)), None);
    }

    #[test]
    fn next_bucket_misses() {
        let mut cache = ResultCache::new(4, Duration::from_secs(300));
        cache.put_at(FilterState::Open, 7, at(600));
        assert_eq!(cache.get_at(FilterState::Open, at(900)), None);
    }

    #[test]
    fn capacity_evicts_least_recent() {
        let mut cache = ResultCache::new(2, Duration::from_secs(300));
        cache.put_at(FilterState::Open, 1, at(0));
        cache.put_at(FilterState::Closed, 2, at(0));
        cache.get_at(FilterState::Open, at(1));
        cache.put_at(FilterState::Rejected, 3, at(2));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at(FilterState::Closed, at(3)), None);
        assert_eq!(cache.get_at(FilterState::Open, at(3)), Some(1));
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let mut cache = ResultCache::new(2, Duration::ZERO);
        cache.put_at(FilterState::All, 1, at(10));
        assert!(cache.is_empty());
        assert_eq!(cache.get_at(FilterState::All, at(10)), None);
    }
}
