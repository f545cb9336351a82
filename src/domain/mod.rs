//! Domain layer - pure admission rules with no I/O.
//!
//! This layer contains the core concepts and invariants of the gate:
//! - Client identity (the attribution key for counters and status)
//! - Per-check decisions and the final admission verdict
//! - The verification state machine transitions
//! - The challenge policy and response parsing
//! - Audit events handed to the logging collaborator
//!
//! All types in this layer are pure and easily testable.

pub mod audit;
pub mod challenge;
pub mod client;
pub mod decision;
pub mod error;
pub mod verification;
