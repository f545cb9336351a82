//! Mock implementations for testing.
//!
//! Test doubles for the ports, so gate behavior can be driven
//! deterministically: time, store failures, audit and enforcement calls,
//! and emitted log lines.

pub mod clock;
pub mod layer;
pub mod recording;
pub mod store;

pub use clock::MockClock;
pub use layer::{CapturedEvent, MockCaptureLayer};
pub use recording::{RecordingAuditSink, RecordingEnforcer};
pub use store::{FailureMode, FlakyCounterStore};
