//! Short-window rate limiting.
//!
//! Counts requests per client under `rate:<client>` and reports when the
//! post-increment count goes over the limit. Exceeding the limit does not
//! block anyone by itself; the gate escalates the client to a challenge.

use crate::application::ports::CounterStore;
use crate::domain::client::ClientIdentity;
use crate::domain::decision::RateDecision;
use crate::domain::error::StoreError;
use std::sync::Arc;
use std::time::Duration;

/// Counter-store namespace for the rate limiter.
pub const RATE_NAMESPACE: &str = "rate";

/// Enforces at most `limit` requests per client within `window`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    /// Create a rate limiter over `store`.
    pub fn new(store: Arc<dyn CounterStore>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    /// Count one request from `client` and compare against the limit.
    ///
    /// # Errors
    /// Returns `StoreError` if the counter store cannot be reached.
    pub fn check(&self, client: &ClientIdentity) -> Result<RateDecision, StoreError> {
        let count = self
            .store
            .increment(&client.counter_key(RATE_NAMESPACE), self.window)?;

        if count > self.limit {
            Ok(RateDecision::Exceeded)
        } else {
            Ok(RateDecision::WithinLimit)
        }
    }

    /// Requests counted for `client` in the current window.
    ///
    /// # Errors
    /// Returns `StoreError` if the counter store cannot be reached.
    pub fn current(&self, client: &ClientIdentity) -> Result<u64, StoreError> {
        Ok(self
            .store
            .get(&client.counter_key(RATE_NAMESPACE))?
            .unwrap_or(0))
    }

    /// Configured limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Configured window.
    pub fn window(&self) -> Duration {
        self.window
    }
}
