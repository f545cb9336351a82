//! Observability metrics for the admission gate.

use crate::domain::decision::AdmissionVerdict;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters describing what the gate has decided so far.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    allowed: AtomicU64,
    challenged: AtomicU64,
    blocked: AtomicU64,
    /// Requests allowed because the counter store could not be consulted
    fail_open: AtomicU64,
    /// Successful challenge responses that verified a client
    verified: AtomicU64,
    /// Incorrect or malformed challenge responses
    rejected_responses: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_verdict(&self, verdict: AdmissionVerdict) {
        let counter = match verdict {
            AdmissionVerdict::Allow => &self.inner.allowed,
            AdmissionVerdict::Challenge => &self.inner.challenged,
            AdmissionVerdict::Block => &self.inner.blocked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fail_open(&self) {
        self.inner.fail_open.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_verified(&self) {
        self.inner.verified.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_response(&self) {
        self.inner.rejected_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests that received ALLOW.
    pub fn allowed(&self) -> u64 {
        self.inner.allowed.load(Ordering::Relaxed)
    }

    /// Requests that received CHALLENGE.
    pub fn challenged(&self) -> u64 {
        self.inner.challenged.load(Ordering::Relaxed)
    }

    /// Requests that received BLOCK.
    pub fn blocked(&self) -> u64 {
        self.inner.blocked.load(Ordering::Relaxed)
    }

    /// Requests that failed open.
    pub fn fail_open(&self) -> u64 {
        self.inner.fail_open.load(Ordering::Relaxed)
    }

    /// Clients verified through the challenge.
    pub fn verified(&self) -> u64 {
        self.inner.verified.load(Ordering::Relaxed)
    }

    /// Challenge responses scored incorrect.
    pub fn rejected_responses(&self) -> u64 {
        self.inner.rejected_responses.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            allowed: self.allowed(),
            challenged: self.challenged(),
            blocked: self.blocked(),
            fail_open: self.fail_open(),
            verified: self.verified(),
            rejected_responses: self.rejected_responses(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.allowed.store(0, Ordering::Relaxed);
        self.inner.challenged.store(0, Ordering::Relaxed);
        self.inner.blocked.store(0, Ordering::Relaxed);
        self.inner.fail_open.store(0, Ordering::Relaxed);
        self.inner.verified.store(0, Ordering::Relaxed);
        self.inner.rejected_responses.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub allowed: u64,
    pub challenged: u64,
    pub blocked: u64,
    pub fail_open: u64,
    pub verified: u64,
    pub rejected_responses: u64,
}

impl MetricsSnapshot {
    /// Total admission decisions.
    pub fn total(&self) -> u64 {
        self.allowed
            .saturating_add(self.challenged)
            .saturating_add(self.blocked)
    }

    /// Share of decisions that were CHALLENGE (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been decided yet.
    pub fn challenge_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.challenged as f64 / total as f64
        }
    }
}
