//! Gate configuration.
//!
//! All thresholds and windows live here rather than in the detectors, so a
//! deployment can tune them without touching the pipeline.

use crate::application::circuit_breaker::CircuitBreakerConfig;
use std::fmt;
use std::time::Duration;

/// Error returned when a configuration value is out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `rate_limit_count` must be greater than zero
    ZeroRateLimit,
    /// `rate_limit_window` must be greater than zero
    ZeroRateWindow,
    /// `flood_threshold` must be greater than zero
    ZeroFloodThreshold,
    /// `flood_window` must be greater than zero
    ZeroFloodWindow,
    /// `block_threshold` must be above `flood_threshold`
    BlockBelowFlood {
        /// Configured block threshold
        block: u64,
        /// Configured flood threshold
        flood: u64,
    },
    /// `verified_ttl` must be greater than zero when set
    ZeroVerifiedTtl,
    /// Circuit breaker failure threshold must be greater than zero
    ZeroFailureThreshold,
    /// `max_counters` must be greater than zero when set
    ZeroMaxCounters,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroRateLimit => write!(f, "rate_limit_count must be greater than 0"),
            ConfigError::ZeroRateWindow => write!(f, "rate_limit_window must be greater than 0"),
            ConfigError::ZeroFloodThreshold => write!(f, "flood_threshold must be greater than 0"),
            ConfigError::ZeroFloodWindow => write!(f, "flood_window must be greater than 0"),
            ConfigError::BlockBelowFlood { block, flood } => write!(
                f,
                "block_threshold ({}) must be greater than flood_threshold ({})",
                block, flood
            ),
            ConfigError::ZeroVerifiedTtl => write!(f, "verified_ttl must be greater than 0"),
            ConfigError::ZeroFailureThreshold => {
                write!(f, "circuit breaker failure_threshold must be greater than 0")
            }
            ConfigError::ZeroMaxCounters => write!(f, "max_counters must be greater than 0"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Default cap on in-memory counter records.
pub const DEFAULT_MAX_COUNTERS: usize = 100_000;

/// Thresholds and windows for the admission pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Requests allowed per `rate_limit_window` before the rate limiter
    /// fires (default: 10)
    pub rate_limit_count: u64,
    /// Short counting window (default: 60s)
    pub rate_limit_window: Duration,
    /// Flood fires once the long-horizon count goes above this
    /// (default: 100)
    pub flood_threshold: u64,
    /// Long counting window for the flood detector (default: 600s)
    pub flood_window: Duration,
    /// Flood count above which the verdict becomes BLOCK and enforcement is
    /// suggested. `None` disables blocking (default).
    pub block_threshold: Option<u64>,
    /// How long a VERIFIED status lasts. `None` keeps it for the lifetime
    /// of the status record (default).
    pub verified_ttl: Option<Duration>,
    /// Fail-open breaker guarding the counter store
    pub circuit_breaker: CircuitBreakerConfig,
    /// Cap on records held by the default in-memory counter store, two per
    /// active client. `None` leaves it unbounded apart from expiry sweeps.
    /// A store passed to the builder keeps its own limits. (default: 100,000)
    pub max_counters: Option<usize>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            rate_limit_count: 10,
            rate_limit_window: Duration::from_secs(60),
            flood_threshold: 100,
            flood_window: Duration::from_secs(600),
            block_threshold: None,
            verified_ttl: None,
            circuit_breaker: CircuitBreakerConfig::default(),
            max_counters: Some(DEFAULT_MAX_COUNTERS),
        }
    }
}

impl GateConfig {
    /// Set the short-window rate limit.
    pub fn with_rate_limit(mut self, count: u64, window: Duration) -> Self {
        self.rate_limit_count = count;
        self.rate_limit_window = window;
        self
    }

    /// Set the flood threshold and horizon.
    pub fn with_flood(mut self, threshold: u64, window: Duration) -> Self {
        self.flood_threshold = threshold;
        self.flood_window = window;
        self
    }

    /// Enable BLOCK verdicts above `threshold` flood requests.
    pub fn with_block_threshold(mut self, threshold: u64) -> Self {
        self.block_threshold = Some(threshold);
        self
    }

    /// Expire VERIFIED status after `ttl`.
    pub fn with_verified_ttl(mut self, ttl: Duration) -> Self {
        self.verified_ttl = Some(ttl);
        self
    }

    /// Override the circuit breaker settings.
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Cap the default in-memory counter store at `max` records.
    pub fn with_max_counters(mut self, max: usize) -> Self {
        self.max_counters = Some(max);
        self
    }

    /// Let the default in-memory counter store grow without a cap.
    ///
    /// Expired records are still swept.
    pub fn with_unlimited_counters(mut self) -> Self {
        self.max_counters = None;
        self
    }

    /// Check every field is in range.
    ///
    /// # Errors
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_count == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }
        if self.rate_limit_window.is_zero() {
            return Err(ConfigError::ZeroRateWindow);
        }
        if self.flood_threshold == 0 {
            return Err(ConfigError::ZeroFloodThreshold);
        }
        if self.flood_window.is_zero() {
            return Err(ConfigError::ZeroFloodWindow);
        }
        if let Some(block) = self.block_threshold {
            if block <= self.flood_threshold {
                return Err(ConfigError::BlockBelowFlood {
                    block,
                    flood: self.flood_threshold,
                });
            }
        }
        if matches!(self.verified_ttl, Some(ttl) if ttl.is_zero()) {
            return Err(ConfigError::ZeroVerifiedTtl);
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.max_counters == Some(0) {
            return Err(ConfigError::ZeroMaxCounters);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GateConfig::default();
        assert_eq!(config.rate_limit_count, 10);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.flood_threshold, 100);
        assert_eq!(config.block_threshold, None);
        assert_eq!(config.verified_ttl, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = GateConfig::default().with_rate_limit(0, Duration::from_secs(60));
        assert_eq!(config.validate(), Err(ConfigError::ZeroRateLimit));

        let config = GateConfig::default().with_rate_limit(5, Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroRateWindow));

        let config = GateConfig::default().with_flood(0, Duration::from_secs(60));
        assert_eq!(config.validate(), Err(ConfigError::ZeroFloodThreshold));

        let config = GateConfig::default().with_flood(100, Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroFloodWindow));

        let config = GateConfig::default().with_verified_ttl(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroVerifiedTtl));
    }

    #[test]
    fn test_block_threshold_must_exceed_flood() {
        let config = GateConfig::default().with_block_threshold(100);
        assert_eq!(
            config.validate(),
            Err(ConfigError::BlockBelowFlood {
                block: 100,
                flood: 100
            })
        );

        let config = GateConfig::default().with_block_threshold(500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_failure_threshold_rejected() {
        let config = GateConfig::default().with_circuit_breaker(CircuitBreakerConfig {
            failure_threshold: 0,
            recovery_timeout: Duration::from_secs(1),
        });
        assert_eq!(config.validate(), Err(ConfigError::ZeroFailureThreshold));
    }

    #[test]
    fn test_counter_cap() {
        assert_eq!(GateConfig::default().max_counters, Some(DEFAULT_MAX_COUNTERS));

        let config = GateConfig::default().with_max_counters(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxCounters));

        let config = GateConfig::default().with_unlimited_counters();
        assert_eq!(config.max_counters, None);
        assert!(config.validate().is_ok());
    }
}
