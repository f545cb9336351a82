//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain rules and owns the runtime behavior:
//! - Rate limiter and flood detector (counting)
//! - Verification state machine (status transitions)
//! - Admission gate (per-request decisions)
//! - Circuit breaker and metrics (fail-open and observability)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod circuit_breaker;
pub mod config;
pub mod flood;
pub mod gate;
pub mod metrics;
pub mod ports;
pub mod rate_limiter;
pub mod verification;
