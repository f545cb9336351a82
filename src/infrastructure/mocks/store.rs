//! Counter store that fails on demand.

use crate::application::ports::CounterStore;
use crate::domain::error::StoreError;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a [`FlakyCounterStore`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Forward to the inner store
    Healthy = 0,
    /// Every call times out
    Timeout = 1,
    /// Every call reports the store unreachable
    Unavailable = 2,
}

impl From<u8> for FailureMode {
    fn from(value: u8) -> Self {
        match value {
            1 => FailureMode::Timeout,
            2 => FailureMode::Unavailable,
            _ => FailureMode::Healthy,
        }
    }
}

/// Wraps a real counter store and injects failures.
///
/// Counts every call that reaches it, so tests can check that an open
/// circuit keeps traffic off the store.
#[derive(Debug)]
pub struct FlakyCounterStore {
    inner: Arc<dyn CounterStore>,
    mode: AtomicU8,
    calls: AtomicU64,
}

impl FlakyCounterStore {
    /// Wrap `inner`, starting healthy.
    pub fn new(inner: Arc<dyn CounterStore>) -> Self {
        Self {
            inner,
            mode: AtomicU8::new(FailureMode::Healthy as u8),
            calls: AtomicU64::new(0),
        }
    }

    /// Change how later calls are answered.
    pub fn set_mode(&self, mode: FailureMode) {
        self.mode.store(mode as u8, Ordering::SeqCst);
    }

    /// Current failure mode.
    pub fn mode(&self) -> FailureMode {
        FailureMode::from(self.mode.load(Ordering::SeqCst))
    }

    /// Calls that reached this store.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode() {
            FailureMode::Healthy => Ok(()),
            FailureMode::Timeout => Err(StoreError::Timeout(Duration::from_millis(50))),
            FailureMode::Unavailable => {
                Err(StoreError::Unavailable("connection refused".to_string()))
            }
        }
    }
}

impl CounterStore for FlakyCounterStore {
    fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        self.fail()?;
        self.inner.increment(key, window)
    }

    fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.fail()?;
        self.inner.get(key)
    }

    fn purge_expired(&self) -> usize {
        self.inner.purge_expired()
    }
}
