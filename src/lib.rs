//! # admission-gate
//!
//! Per-client admission control for inbound requests.
//!
//! Each request is classified by its source address into one of three
//! verdicts: **allow** it, send the client to a **challenge**, or **block**
//! it. Two independent counters decide when a client looks abusive: a
//! short-window rate limiter and a higher-threshold flood detector. An
//! abusive client is escalated into a small verification state machine and
//! stays challenged until it answers correctly.
//!
//! ## Quick Start
//!
//! ```rust
//! use admission_gate::{AdmissionGate, AdmissionVerdict, ChallengeResponse, ClientIdentity, GateConfig};
//! use std::time::Duration;
//!
//! let gate = AdmissionGate::builder()
//!     .with_config(GateConfig::default().with_rate_limit(2, Duration::from_secs(60)))
//!     .build()
//!     .unwrap();
//!
//! let client: ClientIdentity = "203.0.113.7".parse().unwrap();
//!
//! assert_eq!(gate.admit(&client), AdmissionVerdict::Allow);
//! assert_eq!(gate.admit(&client), AdmissionVerdict::Allow);
//! assert_eq!(gate.admit(&client), AdmissionVerdict::Challenge);
//!
//! // The verification route hands the client's answer back to the gate
//! gate.submit_response(&client, &ChallengeResponse::answer("6"));
//! assert_eq!(gate.admit(&client), AdmissionVerdict::Allow);
//! ```
//!
//! The verdict is a plain value; turning CHALLENGE into a redirect or BLOCK
//! into a 403 is up to the caller.
//!
//! ## How a request is judged
//!
//! 1. A **verified** client is allowed without touching any counter.
//! 2. The **flood detector** counts the request under `flood:<client>`
//!    (default: more than 100 per 10 minutes). Above the optional
//!    `block_threshold` the verdict is BLOCK and an [`Enforcer`] is asked,
//!    once, to block the client at the network layer.
//! 3. The **rate limiter** counts the request under `rate:<client>`
//!    (default: more than 10 per minute).
//! 4. A client that is already **challenged** keeps getting CHALLENGE until
//!    it answers correctly, even if its counters have since reset.
//!
//! Steps 2 and 3 escalate the client to CHALLENGED when they fire. Every
//! request is recorded to an [`AuditSink`].
//!
//! ## Features
//!
//! - **Pluggable counter store**: in-process [`MemoryCounterStore`] by
//!   default, `RedisCounterStore` (feature `redis-storage`) to share
//!   counters between processes
//! - **Fail-open circuit breaker**: store outages never become denial of
//!   service
//! - **Verification expiry**: optionally re-challenge clients after
//!   `verified_ttl`
//! - **Observability metrics**: allowed, challenged, blocked, fail-open,
//!   verified and rejected responses
//! - **Audit sinks**: JSON lines file, `tracing`, or none
//!
//! ## Observability
//!
//! ```rust
//! # use admission_gate::{AdmissionGate, ClientIdentity};
//! # let gate = AdmissionGate::builder().build().unwrap();
//! # gate.admit(&"198.51.100.4".parse::<ClientIdentity>().unwrap());
//! let snapshot = gate.metrics().snapshot();
//! println!("Allowed: {}", snapshot.allowed);
//! println!("Challenged: {}", snapshot.challenged);
//! println!("Challenge rate: {:.2}%", snapshot.challenge_rate() * 100.0);
//!
//! let counts = gate.status_counts();
//! println!("Clients awaiting a challenge answer: {}", counts.challenged);
//! ```
//!
//! ## Fail-Safe Operation
//!
//! If the counter store times out or is unreachable the request is judged
//! as if no counter fired, and one warning is logged for it. Repeated
//! failures open a circuit breaker so the store is left alone until it has
//! had time to recover:
//!
//! ```rust
//! # use admission_gate::{AdmissionGate, CircuitState};
//! # let gate = AdmissionGate::builder().build().unwrap();
//! match gate.circuit_breaker().state() {
//!     CircuitState::Closed => println!("Normal operation"),
//!     CircuitState::Open => println!("Failing open - counters skipped"),
//!     CircuitState::HalfOpen => println!("Testing recovery"),
//! }
//! ```
//!
//! Failing open never releases a challenged client: it still gets CHALLENGE.
//!
//! ## Unidentifiable clients
//!
//! [`AdmissionGate::admit_addr`] takes the raw source address. If it cannot
//! be parsed the request fails closed with CHALLENGE, since there is no key
//! to count it under. It is still audited, under the raw address.
//!
//! ## Memory
//!
//! The default in-memory counter store sweeps expired counters as it is
//! used and holds at most `GateConfig::max_counters` records.
//! [`AdmissionGate::prune`] reclaims expired counters and idle status
//! records on demand.
//!
//! ## Logging
//!
//! The crate logs through `tracing` and never installs a subscriber.
//! Fail-open and block suggestions are `warn`, status transitions are
//! `info`, per-request decisions are `debug`.

// Types and transition rules, no I/O
pub mod domain;

// Ports, counters and the gate itself
pub mod application;

// Stores, sinks, enforcers and test doubles
pub mod infrastructure;

pub use domain::{
    audit::{AuditEvent, AuditSource},
    challenge::{ChallengePolicy, ChallengeResponse},
    client::ClientIdentity,
    decision::{
        AdmissionVerdict, ChallengeOutcome, Decision, DecisionReason, FloodDecision,
        RateDecision,
    },
    error::{AuditError, EnforcementError, GateError, StoreError},
    verification::{VerificationRecord, VerificationStatus},
};

pub use application::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState},
    config::{ConfigError, GateConfig, DEFAULT_MAX_COUNTERS},
    flood::{FloodDetector, FloodReading},
    gate::{AdmissionGate, AdmissionGateBuilder, DefaultStatusStore, PruneReport},
    metrics::{Metrics, MetricsSnapshot},
    ports::{AuditSink, Clock, CounterStore, Enforcer, Storage},
    rate_limiter::RateLimiter,
    verification::{StatusCounts, VerificationStateMachine},
};

pub use infrastructure::{
    audit::{JsonLinesAuditSink, NoopAuditSink, TracingAuditSink},
    clock::SystemClock,
    enforcement::{NoopEnforcer, TracingEnforcer},
    memory_store::{CounterRecord, MemoryCounterStore, DEFAULT_SWEEP_INTERVAL},
    storage::ShardedStorage,
};

#[cfg(feature = "redis-storage")]
pub use infrastructure::redis_store::{RedisCounterStore, RedisCounterStoreConfig};
