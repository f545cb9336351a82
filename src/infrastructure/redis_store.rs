//! Redis-backed counter store.
//!
//! Lets several gate processes share one set of counters.
//!
//! ## Data model
//!
//! - Keys: `<key_prefix><namespace>:<client>`, e.g. `admission-gate:rate:203.0.113.7`
//! - Values: plain Redis integers
//! - Expiry: `PEXPIRE` set once, when the key is created
//!
//! Increment and expiry run in a single Lua script, so a crash between the
//! two can never leave an immortal counter. Every call is bounded by
//! `RedisCounterStoreConfig::timeout`.
//!
//! ## Sync bridge
//!
//! The `CounterStore` port is synchronous. Inside a multi-threaded tokio
//! runtime calls run through `block_in_place`; outside any runtime a
//! short-lived current-thread runtime drives the call. A current-thread
//! runtime cannot block, so calls from one report `StoreError::Unavailable`
//! and the gate fails open.
//!
//! ## Example
//!
//! ```rust,ignore
//! use admission_gate::{AdmissionGate, RedisCounterStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RedisCounterStore::connect("redis://127.0.0.1/")
//!         .await
//!         .expect("Failed to connect to Redis");
//!
//!     let gate = AdmissionGate::builder()
//!         .with_counter_store(Arc::new(store))
//!         .build()
//!         .unwrap();
//! }
//! ```

use crate::application::ports::CounterStore;
use crate::domain::error::StoreError;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};

const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return count
";

/// Configuration for the Redis counter store.
#[derive(Debug, Clone)]
pub struct RedisCounterStoreConfig {
    /// Prepended to every key (default: "admission-gate:")
    pub key_prefix: String,
    /// Upper bound on a single store call (default: 100ms)
    pub timeout: Duration,
}

impl Default for RedisCounterStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "admission-gate:".to_string(),
            timeout: Duration::from_millis(100),
        }
    }
}

/// Counter store shared through Redis.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
    config: RedisCounterStoreConfig,
    script: Script,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Connect with the default configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> Result<Self, RedisError> {
        Self::connect_with_config(url, RedisCounterStoreConfig::default()).await
    }

    /// Connect with a custom configuration.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect_with_config(
        url: &str,
        config: RedisCounterStoreConfig,
    ) -> Result<Self, RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection,
            config,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &RedisCounterStoreConfig {
        &self.config
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// Increment asynchronously, bounded by the configured timeout.
    ///
    /// # Errors
    /// Returns `StoreError` on timeout or Redis failure.
    pub async fn increment_async(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let key = self.key(key);
        let window_ms = u64::try_from(window.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        let mut conn = self.connection.clone();

        let call = async {
            self.script
                .key(&key)
                .arg(window_ms)
                .invoke_async::<_, u64>(&mut conn)
                .await
        };
        self.bounded(call).await
    }

    /// Read a counter asynchronously, bounded by the configured timeout.
    ///
    /// # Errors
    /// Returns `StoreError` on timeout or Redis failure.
    pub async fn get_async(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let key = self.key(key);
        let mut conn = self.connection.clone();

        let call = async { conn.get::<_, Option<u64>>(&key).await };
        self.bounded(call).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RedisError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
            Err(_) => Err(StoreError::Timeout(self.config.timeout)),
        }
    }

    /// Drive an async store call from synchronous code.
    fn block_on<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::CurrentThread => Err(StoreError::Unavailable(
                    "cannot block inside a current-thread runtime".to_string(),
                )),
                _ => tokio::task::block_in_place(|| handle.block_on(call)),
            },
            Err(_) => {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                rt.block_on(call)
            }
        }
    }
}

impl CounterStore for RedisCounterStore {
    fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        self.block_on(self.increment_async(key, window))
    }

    fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.block_on(self.get_async(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisCounterStoreConfig::default();
        assert_eq!(config.key_prefix, "admission-gate:");
        assert_eq!(config.timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_script_sets_expiry_only_on_first_increment() {
        assert!(INCREMENT_SCRIPT.contains("if count == 1 then"));
        assert!(INCREMENT_SCRIPT.contains("PEXPIRE"));
    }
}
