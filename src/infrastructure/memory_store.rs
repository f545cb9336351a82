//! In-process counter store.
//!
//! Fixed-window counters in a sharded map. A window opens on the first
//! increment of an absent or expired key and lasts for the `window` passed
//! with that increment; later increments inside the window do not extend
//! it. Expiry is evaluated lazily against the injected clock.
//!
//! ## Bounding memory
//!
//! Every client leaves records behind, so the map is kept in check two ways:
//!
//! - **Sweeps**: at most once per `sweep_interval` (default 60s) an
//!   increment drops every expired record.
//! - **Cap**: with `max_counters` set, inserting a new key into a full map
//!   first evicts one record, chosen from a small sample: an expired record
//!   if the sample has one, otherwise the one with the oldest window. The
//!   cap is soft under concurrent inserts.

use crate::application::ports::{Clock, CounterStore};
use crate::domain::error::StoreError;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default pause between sweeps of expired records.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Records inspected when picking an eviction victim.
const EVICTION_SAMPLE: usize = 16;

/// One counter and its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRecord {
    /// Increments seen in the current window
    pub count: u64,
    /// When the current window opened
    pub window_start: Instant,
    /// How long the window lasts
    pub ttl: Duration,
}

impl CounterRecord {
    fn open(now: Instant, ttl: Duration) -> Self {
        Self {
            count: 0,
            window_start: now,
            ttl,
        }
    }

    /// Whether the window has closed at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) >= self.ttl
    }
}

/// Counter store living in this process.
///
/// Increments are atomic per key: the map's entry lock is held across the
/// read-modify-write.
#[derive(Debug)]
pub struct MemoryCounterStore {
    counters: DashMap<String, CounterRecord, RandomState>,
    clock: Arc<dyn Clock>,
    origin: Instant,
    /// Nanoseconds after `origin` of the last sweep
    last_sweep: AtomicU64,
    sweep_interval: Duration,
    max_counters: Option<usize>,
}

impl MemoryCounterStore {
    /// Create an empty, uncapped store driven by `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let origin = clock.now();
        Self {
            counters: DashMap::with_hasher(RandomState::new()),
            clock,
            origin,
            last_sweep: AtomicU64::new(0),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_counters: None,
        }
    }

    /// Sweep expired records at most once per `interval`.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Hold roughly `max` records at most, evicting to make room.
    pub fn with_max_counters(mut self, max: usize) -> Self {
        self.max_counters = Some(max);
        self
    }

    pub fn max_counters(&self) -> Option<usize> {
        self.max_counters
    }

    /// Copy of the live record for `key`, if any.
    pub fn record(&self, key: &str) -> Option<CounterRecord> {
        let now = self.clock.now();
        self.counters
            .get(key)
            .map(|r| *r.value())
            .filter(|r| !r.is_expired(now))
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Check if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    fn nanos_since_origin(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.origin).as_nanos()).unwrap_or(u64::MAX)
    }

    fn sweep_if_due(&self, now: Instant) {
        let now_nanos = self.nanos_since_origin(now);
        let last = self.last_sweep.load(Ordering::Acquire);
        let interval = u64::try_from(self.sweep_interval.as_nanos()).unwrap_or(u64::MAX);
        if now_nanos.saturating_sub(last) < interval {
            return;
        }

        // One caller per interval does the sweep
        if self
            .last_sweep
            .compare_exchange(last, now_nanos, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.purge_expired();
        }
    }

    /// Evict one sampled record. Returns `false` if the map is empty.
    fn evict_one(&self, now: Instant) -> bool {
        let victim = self
            .counters
            .iter()
            .take(EVICTION_SAMPLE)
            .min_by_key(|entry| (!entry.value().is_expired(now), entry.value().window_start))
            .map(|entry| entry.key().clone());

        match victim {
            Some(key) => {
                self.counters.remove(&key);
                tracing::debug!(key = %key, "evicted counter to stay under max_counters");
                true
            }
            None => false,
        }
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let now = self.clock.now();
        self.sweep_if_due(now);

        if let Some(max) = self.max_counters {
            if self.counters.len() >= max && !self.counters.contains_key(key) {
                self.evict_one(now);
            }
        }

        let mut record = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| CounterRecord::open(now, window));

        if record.is_expired(now) {
            *record = CounterRecord::open(now, window);
        }
        record.count = record.count.saturating_add(1);

        Ok(record.count)
    }

    fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.record(key).map(|r| r.count))
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.counters.len();
        self.counters.retain(|_, record| !record.is_expired(now));
        let purged = before.saturating_sub(self.counters.len());

        if purged > 0 {
            tracing::debug!(purged, "purged expired counters");
        }
        purged
    }
}
