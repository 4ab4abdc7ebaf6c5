//! Time-to-live cache layer.
//!
//! A concurrent map of `key -> (value, inserted_at)` backed by [`DashMap`].
//! Entries expire lazily: a read that finds an entry older than the TTL
//! treats it as absent and drops it. There is no background sweep and no
//! entry-count bound, so the map grows with the number of distinct keys
//! seen during the process lifetime.
//!
//! Concurrent writers to the same key simply overwrite each other
//! (last write wins).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::clock::{Clock, SystemClock};

/// Default entry lifetime: 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(1_800_000);

// ── cache stats ──────────────────────────────────────────────────────

/// Counters tracking cache effectiveness.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    /// Total cache hits since creation.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total cache misses since creation, expired reads included.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Reads that found an entry past its TTL.
    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }

    /// Total lookups (hits + misses).
    pub fn total(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Hit rate as a value between 0.0 and 1.0 (returns 0.0 if no lookups).
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.hits() as f64 / total as f64
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} expired={} rate={:.2}%",
            self.hits(),
            self.misses(),
            self.expired(),
            self.hit_rate() * 100.0,
        )
    }
}

// ── cache ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    inserted_at: DateTime<Utc>,
}

/// A keyed cache whose entries are valid for a fixed TTL after insertion.
///
/// Cloning is cheap and clones share storage, clock and stats.
///
/// ```ignore
/// let cache: TtlCache<Agent> = TtlCache::builder("agents").build();
/// let agent = match cache.get(id) {
///     Some(agent) => agent,
///     None => {
///         let agent = store.get(id).await?;
///         cache.insert(id, agent.clone());
///         agent
///     }
/// };
/// ```
pub struct TtlCache<T> {
    name: &'static str,
    ttl: Duration,
    entries: Arc<DashMap<String, CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
    stats: Arc<CacheStats>,
}

impl<T> Clone for TtlCache<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            ttl: self.ttl,
            entries: Arc::clone(&self.entries),
            clock: Arc::clone(&self.clock),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T: Clone> TtlCache<T> {
    /// Start building a new cache.
    pub fn builder(name: &'static str) -> TtlCacheBuilder<T> {
        TtlCacheBuilder {
            name,
            ttl: DEFAULT_TTL,
            clock: Arc::new(SystemClock),
            _marker: std::marker::PhantomData,
        }
    }

    /// Look up a live entry. Returns `None` on a miss or an expired entry.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();

        let lookup = self.entries.get(key).map(|entry| {
            if self.is_fresh(entry.inserted_at, now) {
                Some(entry.value.clone())
            } else {
                None
            }
        });

        match lookup {
            Some(Some(value)) => {
                self.stats.record_hit();
                debug!(cache = self.name, key, "cache hit");
                Some(value)
            }
            Some(None) => {
                // The read guard is released above, so removing cannot deadlock.
                self.entries
                    .remove_if(key, |_, entry| !self.is_fresh(entry.inserted_at, now));
                self.stats.record_expired();
                self.stats.record_miss();
                debug!(cache = self.name, key, "cache entry expired");
                None
            }
            None => {
                self.stats.record_miss();
                debug!(cache = self.name, key, "cache miss");
                None
            }
        }
    }

    /// Insert or overwrite `key`, stamping it with the current time.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        debug!(cache = self.name, key = %key, "cache insert");
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: self.clock.now(),
            },
        );
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, inserted_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - inserted_at).to_std() {
            Ok(age) => age < self.ttl,
            // Negative age: the clock went backwards, keep the entry.
            Err(_) => true,
        }
    }
}

// ── builder ──────────────────────────────────────────────────────────

/// Builder for [`TtlCache`].
pub struct TtlCacheBuilder<T> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Clone> TtlCacheBuilder<T> {
    /// Lifetime of each entry after insertion.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Time source used to stamp and age entries.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> TtlCache<T> {
        debug!(
            name = self.name,
            ttl_ms = self.ttl.as_millis() as u64,
            "ttl cache created"
        );

        TtlCache {
            name: self.name,
            ttl: self.ttl,
            entries: Arc::new(DashMap::new()),
            clock: self.clock,
            stats: Arc::new(CacheStats::default()),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
