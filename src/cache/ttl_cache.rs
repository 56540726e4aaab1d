//! TTL Cache
//!
//! Fixed time-to-live cache for normalized market data. Expired entries are
//! never served; they linger until `cleanup` or until capacity pressure
//! purges them.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Cache entry with TTL tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            ttl,
        }
    }

    /// Check if entry is still valid at `now`
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }

    /// Get time remaining before expiry
    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.inserted_at);
        self.ttl.checked_sub(elapsed).filter(|d| !d.is_zero())
    }
}

/// Fixed-TTL cache with bounded size
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Default TTL (30 seconds)
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
    /// Default max cache entries
    pub const DEFAULT_MAX_ENTRIES: usize = 1000;

    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_TTL, Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_config(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    /// Insert at an explicit instant; at capacity, expired entries go first,
    /// then the oldest insertion
    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.cleanup_at(now);
            if self.entries.len() >= self.max_entries {
                self.remove_oldest();
            }
        }
        self.entries.insert(key, CacheEntry::new(value, self.ttl, now));
    }

    /// Get a cached value if valid, counting the hit or miss
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        let found = self
            .entries
            .get(key)
            .filter(|entry| entry.is_valid_at(now))
            .map(|entry| entry.value.clone());
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Look at an entry without touching hit/miss counters
    pub fn peek_entry_at(&self, key: &K, now: Instant) -> Option<&CacheEntry<V>> {
        self.entries.get(key).filter(|entry| entry.is_valid_at(now))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.peek_entry_at(key, Instant::now()).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove expired entries
    pub fn cleanup(&mut self) {
        self.cleanup_at(Instant::now());
    }

    pub fn cleanup_at(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_valid_at(now));
    }

    fn remove_oldest(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest_key);
        }
    }

    /// Number of entries (including expired)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn valid_count_at(&self, now: Instant) -> usize {
        self.entries.values().filter(|e| e.is_valid_at(now)).count()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats_at(Instant::now())
    }

    pub fn stats_at(&self, now: Instant) -> CacheStats {
        let total = self.entries.len();
        let valid = self.valid_count_at(now);
        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl std::ops::Add for CacheStats {
    type Output = CacheStats;

    fn add(self, other: CacheStats) -> CacheStats {
        CacheStats {
            total_entries: self.total_entries + other.total_entries,
            valid_entries: self.valid_entries + other.valid_entries,
            expired_entries: self.expired_entries + other.expired_entries,
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
        }
    }
}
