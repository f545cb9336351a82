//! Error types for the admission pipeline.
//!
//! None of these errors is fatal to the hosting service. Each one is resolved
//! per request into a verdict: store failures fail open, unidentifiable
//! clients fail closed and malformed challenge responses score as incorrect.

use std::fmt;
use std::time::Duration;

/// Failure talking to the counter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection refused, dropped, or the backend returned an error
    Unavailable(String),
    /// The call did not complete within the configured bound
    Timeout(Duration),
    /// The circuit breaker is open; the store was not contacted
    CircuitOpen,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "counter store unavailable: {}", reason),
            StoreError::Timeout(after) => {
                write!(f, "counter store call timed out after {:?}", after)
            }
            StoreError::CircuitOpen => write!(f, "counter store circuit open"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors surfaced by the gate while classifying a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Counter store timeout or connection failure (fail open)
    StoreUnavailable(StoreError),
    /// Missing or unparseable source address (fail closed)
    InvalidClientIdentity(String),
    /// Challenge response could not be interpreted (scored incorrect)
    ChallengeResponseMalformed(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::StoreUnavailable(e) => write!(f, "{}", e),
            GateError::InvalidClientIdentity(raw) => {
                write!(f, "invalid client identity: {:?}", raw)
            }
            GateError::ChallengeResponseMalformed(reason) => {
                write!(f, "malformed challenge response: {}", reason)
            }
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GateError::StoreUnavailable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for GateError {
    fn from(e: StoreError) -> Self {
        GateError::StoreUnavailable(e)
    }
}

/// Failure recording an audit event.
#[derive(Debug)]
pub enum AuditError {
    /// Writing to the audit destination failed
    Io(std::io::Error),
    /// The event could not be serialized
    Serialize(String),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::Io(e) => write!(f, "audit write failed: {}", e),
            AuditError::Serialize(reason) => write!(f, "audit serialization failed: {}", reason),
        }
    }
}

impl std::error::Error for AuditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuditError::Io(e) => Some(e),
            AuditError::Serialize(_) => None,
        }
    }
}

impl From<std::io::Error> for AuditError {
    fn from(e: std::io::Error) -> Self {
        AuditError::Io(e)
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Serialize(e.to_string())
    }
}

/// Failure handing a block suggestion to the enforcement collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementError(pub String);

impl fmt::Display for EnforcementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enforcement failed: {}", self.0)
    }
}

impl std::error::Error for EnforcementError {}
