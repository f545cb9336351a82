//! Long-horizon flood detection.
//!
//! A second, independent counter under `flood:<client>` with a higher
//! threshold and a longer window. It catches sustained volume that slips
//! under the short rate window, and it runs on every non-verified request
//! before the rate limiter does.

use crate::application::ports::CounterStore;
use crate::domain::client::ClientIdentity;
use crate::domain::decision::FloodDecision;
use crate::domain::error::StoreError;
use std::sync::Arc;
use std::time::Duration;

/// Counter-store namespace for the flood detector.
pub const FLOOD_NAMESPACE: &str = "flood";

/// Post-increment flood count together with the verdict it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodReading {
    /// Requests counted in the current flood window, this one included
    pub count: u64,
    /// Whether `count` is above the flood threshold
    pub decision: FloodDecision,
}

/// Flags clients sending more than `threshold` requests per `window`.
#[derive(Debug, Clone)]
pub struct FloodDetector {
    store: Arc<dyn CounterStore>,
    threshold: u64,
    window: Duration,
}

impl FloodDetector {
    /// Create a flood detector over `store`.
    pub fn new(store: Arc<dyn CounterStore>, threshold: u64, window: Duration) -> Self {
        Self {
            store,
            threshold,
            window,
        }
    }

    /// Count one request from `client` and classify the volume.
    ///
    /// # Errors
    /// Returns `StoreError` if the counter store cannot be reached.
    pub fn check(&self, client: &ClientIdentity) -> Result<FloodDecision, StoreError> {
        self.inspect(client).map(|reading| reading.decision)
    }

    /// Like [`check`](Self::check), but also returns the raw count.
    ///
    /// # Errors
    /// Returns `StoreError` if the counter store cannot be reached.
    pub fn inspect(&self, client: &ClientIdentity) -> Result<FloodReading, StoreError> {
        let count = self
            .store
            .increment(&client.counter_key(FLOOD_NAMESPACE), self.window)?;

        let decision = if count > self.threshold {
            FloodDecision::Flood
        } else {
            FloodDecision::Normal
        };

        Ok(FloodReading { count, decision })
    }

    /// Configured threshold.
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Configured window.
    pub fn window(&self) -> Duration {
        self.window
    }
}
