//! Fail-open guard for the counter store.
//!
//! Consecutive store failures trip the breaker. While it is tripped the gate
//! never waits on the store and judges each request as if no counter fired.
//! Once `recovery_timeout` has passed a single probe call is let through:
//! success closes the breaker, failure trips it for another full timeout.

use crate::application::ports::{Clock, CounterStore};
use crate::domain::error::StoreError;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where the breaker stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Store calls go through
    Closed,
    /// Store calls are skipped until the recovery timeout elapses
    Open,
    /// A probe call is deciding whether the store is back
    HalfOpen,
}

impl CircuitState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Breaker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive store failures that trip the breaker (default: 5)
    pub failure_threshold: u32,
    /// How long a tripped breaker keeps traffic off the store (default: 30s)
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Lock-free breaker in front of the counter store.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: AtomicU8,
    failures: AtomicU64,
    /// Nanoseconds after `origin` at which the breaker last tripped
    tripped_at: AtomicU64,
    probing: AtomicBool,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    origin: Instant,
}

/// Releases the probe slot even if the probed call panics.
struct ProbeSlot<'a>(&'a AtomicBool);

impl Drop for ProbeSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CircuitBreaker {
    /// Create a closed breaker driven by `clock`.
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let origin = clock.now();
        Self {
            state: AtomicU8::new(CircuitState::Closed as u8),
            failures: AtomicU64::new(0),
            tripped_at: AtomicU64::new(0),
            probing: AtomicBool::new(false),
            config,
            clock,
            origin,
        }
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Store failures since the last success.
    pub fn consecutive_failures(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run one store call through the breaker.
    ///
    /// # Errors
    /// Returns `StoreError::CircuitOpen` without running `op` while the
    /// breaker is tripped or another call is probing; otherwise whatever
    /// `op` returns.
    pub fn call<T>(&self, op: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _probe = match self.state() {
            CircuitState::Closed => None,
            CircuitState::HalfOpen => Some(self.claim_probe()?),
            CircuitState::Open => {
                if self.since_tripped() < self.config.recovery_timeout {
                    return Err(StoreError::CircuitOpen);
                }
                let probe = self.claim_probe()?;
                let _ = self.state.compare_exchange(
                    CircuitState::Open as u8,
                    CircuitState::HalfOpen as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                Some(probe)
            }
        };

        let result = op();
        match &result {
            Ok(_) => self.on_success(),
            Err(_) => self.on_failure(),
        }
        result
    }

    /// Close the breaker and forget past failures.
    pub fn reset(&self) {
        self.failures.store(0, Ordering::Release);
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
    }

    fn claim_probe(&self) -> Result<ProbeSlot<'_>, StoreError> {
        self.probing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ProbeSlot(&self.probing))
            .map_err(|_| StoreError::CircuitOpen)
    }

    fn on_success(&self) {
        self.failures.store(0, Ordering::Release);
        let closed = self.state.compare_exchange(
            CircuitState::HalfOpen as u8,
            CircuitState::Closed as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if closed.is_ok() {
            tracing::info!("counter store recovered, circuit closed");
        }
    }

    fn on_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::AcqRel) + 1;

        match self.state() {
            CircuitState::HalfOpen => self.trip(),
            CircuitState::Closed if failures >= u64::from(self.config.failure_threshold) => {
                self.trip();
                // The gate warns once per failed request
                tracing::info!(failures, "counter store failing repeatedly, circuit opened");
            }
            _ => {}
        }
    }

    fn trip(&self) {
        let nanos = self
            .clock
            .now()
            .saturating_duration_since(self.origin)
            .as_nanos();
        self.tripped_at
            .store(u64::try_from(nanos).unwrap_or(u64::MAX), Ordering::Release);
        self.state.store(CircuitState::Open as u8, Ordering::Release);
    }

    fn since_tripped(&self) -> Duration {
        let tripped = self.origin + Duration::from_nanos(self.tripped_at.load(Ordering::Acquire));
        self.clock.now().saturating_duration_since(tripped)
    }
}

/// Counter store whose every call goes through a [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct GuardedStore {
    inner: Arc<dyn CounterStore>,
    breaker: Arc<CircuitBreaker>,
}

impl GuardedStore {
    pub fn new(inner: Arc<dyn CounterStore>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

impl CounterStore for GuardedStore {
    fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        self.breaker.call(|| self.inner.increment(key, window))
    }

    fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.breaker.call(|| self.inner.get(key))
    }

    // Local housekeeping; never counts toward the breaker
    fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }
}
