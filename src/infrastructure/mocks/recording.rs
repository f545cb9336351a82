//! Audit sink and enforcer that remember what they were given.

use crate::application::ports::{AuditSink, Enforcer};
use crate::domain::audit::AuditEvent;
use crate::domain::client::ClientIdentity;
use crate::domain::error::{AuditError, EnforcementError};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Audit sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: AtomicBool,
}

impl RecordingAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make later `record` calls fail (events are still kept).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .expect("RecordingAuditSink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Number of events recorded so far.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .expect("RecordingAuditSink mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .expect("RecordingAuditSink mutex poisoned - a test thread panicked while holding the lock")
            .push(event.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Io(io::Error::new(
                io::ErrorKind::Other,
                "disk full",
            )));
        }
        Ok(())
    }
}

/// Enforcer that keeps every block suggestion in memory.
#[derive(Debug, Default)]
pub struct RecordingEnforcer {
    blocked: Mutex<Vec<ClientIdentity>>,
    failing: AtomicBool,
}

impl RecordingEnforcer {
    /// Create an empty enforcer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make later `block` calls fail (suggestions are still kept).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Clients suggested for blocking, in call order.
    pub fn blocked(&self) -> Vec<ClientIdentity> {
        self.blocked
            .lock()
            .expect("RecordingEnforcer mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }
}

impl Enforcer for RecordingEnforcer {
    fn block(&self, client: &ClientIdentity) -> Result<(), EnforcementError> {
        self.blocked
            .lock()
            .expect("RecordingEnforcer mutex poisoned - a test thread panicked while holding the lock")
            .push(*client);

        if self.failing.load(Ordering::SeqCst) {
            return Err(EnforcementError("firewall unreachable".to_string()));
        }
        Ok(())
    }
}
