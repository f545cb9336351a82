//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - Counter stores (in-memory, Redis)
//! - Status storage (sharded map)
//! - Audit and enforcement collaborators

pub mod audit;
pub mod clock;
pub mod enforcement;
pub mod memory_store;
pub mod storage;

#[cfg(feature = "redis-storage")]
pub mod redis_store;

/// Mock implementations for testing.
///
/// Only available with the `test-helpers` feature or during test builds.
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// admission-gate = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
