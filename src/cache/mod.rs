//! Discovered-layout cache.
//!
//! Once a token's mapping slot and hashing order are found, every later lookup for that token
//! reuses them instead of searching again. One [`SlotCache`] holds one kind of mapping
//! (balances or allowances); a resolver owns one of each.
//!
//! Architecture:
//! ```text
//!   SlotResolver::resolve_*_slot
//!     → SlotCache::get          (hit: reuse slot index + layout, no search)
//!     → SlotCache::lock_token   (miss: one search per token at a time)
//!       → scan                  (eth_getStorageAt probes)
//!       → SlotCache::insert     (success only)
//! ```
//!
//! The cache is safe to share across tasks via [`SharedSlotCache`].

use crate::layout::LayoutConvention;
use alloy_primitives::Address;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A reference-counted, thread-safe handle to a [`SlotCache`].
pub type SharedSlotCache = Arc<SlotCache>;

/// A previously discovered mapping location for one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRecord {
    /// Token contract the record belongs to.
    pub token: Address,
    /// Declaration-order slot of the mapping.
    pub slot_index: u64,
    /// Hashing order the mapping uses.
    pub layout: LayoutConvention,
    /// When the search that produced this record finished.
    pub discovered_at: Instant,
}

impl SlotRecord {
    /// Create a record stamped with the current time.
    pub fn new(token: Address, slot_index: u64, layout: LayoutConvention) -> Self {
        Self { token, slot_index, layout, discovered_at: Instant::now() }
    }

    /// Whether the record is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.discovered_at.elapsed() >= ttl
    }
}

/// Snapshot of cache performance counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a live record.
    pub hits: u64,
    /// Lookups that found nothing (or only an expired record).
    pub misses: u64,
    /// Records written by successful searches.
    pub insertions: u64,
    /// Records dropped because they outlived the TTL.
    pub expirations: u64,
    /// Current number of records.
    pub current_entries: usize,
}

impl CacheStats {
    /// Cache hit rate in the range `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Whether any lookups have been performed yet.
    pub fn is_cold(&self) -> bool {
        self.hits == 0 && self.misses == 0
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<Address, SlotRecord>,
    stats: CacheStats,
}

/// Token address → [`SlotRecord`] map with optional expiry.
///
/// Records never expire unless a TTL is configured. A failed search never writes a record.
#[derive(Debug, Default)]
pub struct SlotCache {
    inner: Mutex<Inner>,
    in_flight: Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>,
    ttl: Option<Duration>,
}

impl SlotCache {
    /// Create a cache whose records never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache whose records are treated as absent once older than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl), ..Default::default() }
    }

    /// Create a shareable cache with an optional TTL.
    pub fn shared(ttl: Option<Duration>) -> SharedSlotCache {
        Arc::new(Self { ttl, ..Default::default() })
    }

    /// The configured TTL, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Look up the record for `token`. Expired records are removed and reported as a miss.
    pub fn get(&self, token: Address) -> Option<SlotRecord> {
        let mut inner = self.inner.lock().expect("slot cache lock poisoned");
        let record = inner.records.get(&token).copied();
        match record {
            Some(record) if self.ttl.is_some_and(|ttl| record.is_expired(ttl)) => {
                inner.records.remove(&token);
                inner.stats.expirations += 1;
                inner.stats.misses += 1;
                inner.stats.current_entries = inner.records.len();
                None
            }
            Some(record) => {
                inner.stats.hits += 1;
                Some(record)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Look up without touching the counters or expiring anything.
    pub fn peek(&self, token: Address) -> Option<SlotRecord> {
        self.inner.lock().expect("slot cache lock poisoned").records.get(&token).copied()
    }

    /// Insert or overwrite the record for its token.
    pub fn insert(&self, record: SlotRecord) {
        let mut inner = self.inner.lock().expect("slot cache lock poisoned");
        inner.records.insert(record.token, record);
        inner.stats.insertions += 1;
        inner.stats.current_entries = inner.records.len();
    }

    /// Drop the record for `token`.
    pub fn invalidate(&self, token: Address) -> bool {
        let mut inner = self.inner.lock().expect("slot cache lock poisoned");
        let removed = inner.records.remove(&token).is_some();
        inner.stats.current_entries = inner.records.len();
        removed
    }

    /// Drop every record.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("slot cache lock poisoned");
        inner.records.clear();
        inner.stats.current_entries = 0;
    }

    /// Current number of records.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("slot cache lock poisoned").records.len()
    }

    /// Whether the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of performance counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().expect("slot cache lock poisoned").stats.clone()
    }

    /// Serialize searches for `token`: the returned guard is held for the duration of a search,
    /// so a second caller for the same token waits and then finds the first caller's record.
    pub async fn lock_token(&self, token: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            Arc::clone(in_flight.entry(token).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from([n; 20])
    }

    fn record(n: u8, slot: u64) -> SlotRecord {
        SlotRecord::new(addr(n), slot, LayoutConvention::Standard)
    }

    #[test]
    fn test_cache_empty_on_creation() {
        let cache = SlotCache::new();
        assert!(cache.is_empty());
        assert!(cache.stats().is_cold());
        assert_eq!(cache.ttl(), None);
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let cache = SlotCache::new();
        assert!(cache.get(addr(1)).is_none());
        cache.insert(record(1, 9));

        let hit = cache.get(addr(1)).unwrap();
        assert_eq!(hit.slot_index, 9);
        assert_eq!(hit.layout, LayoutConvention::Standard);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
        assert_eq!(stats.current_entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_insert_overwrites_whole_record() {
        let cache = SlotCache::new();
        cache.insert(record(1, 9));
        cache.insert(SlotRecord::new(addr(1), 3, LayoutConvention::Reversed));

        let hit = cache.peek(addr(1)).unwrap();
        assert_eq!(hit.slot_index, 3);
        assert_eq!(hit.layout, LayoutConvention::Reversed);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_tokens_are_independent() {
        let cache = SlotCache::new();
        cache.insert(record(1, 0));
        cache.insert(record(2, 5));
        assert_eq!(cache.peek(addr(1)).unwrap().slot_index, 0);
        assert_eq!(cache.peek(addr(2)).unwrap().slot_index, 5);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = SlotCache::with_ttl(Duration::ZERO);
        cache.insert(record(1, 9));
        assert!(cache.get(addr(1)).is_none());
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_long_ttl_keeps_record() {
        let cache = SlotCache::with_ttl(Duration::from_secs(3600));
        cache.insert(record(1, 9));
        assert!(cache.get(addr(1)).is_some());
    }

    #[test]
    fn test_peek_does_not_count() {
        let cache = SlotCache::new();
        cache.insert(record(1, 9));
        cache.peek(addr(1));
        assert!(cache.stats().is_cold());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = SlotCache::new();
        cache.insert(record(1, 1));
        cache.insert(record(2, 2));
        assert!(cache.invalidate(addr(1)));
        assert!(!cache.invalidate(addr(1)));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().current_entries, 0);
    }

    #[tokio::test]
    async fn test_lock_token_serializes_same_token() {
        let cache = Arc::new(SlotCache::new());
        let guard = cache.lock_token(addr(1)).await;

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let _guard = cache.lock_token(addr(1)).await;
                cache.peek(addr(1)).map(|r| r.slot_index)
            })
        };

        // A different token is not blocked.
        drop(cache.lock_token(addr(2)).await);

        cache.insert(record(1, 7));
        drop(guard);
        assert_eq!(waiter.await.unwrap(), Some(7));
    }
}
