//! Clock adapters for time operations.
//!
//! `SystemClock` is the production clock. Tests drive time explicitly with
//! `MockClock` (in `crate::infrastructure::mocks`), available with the
//! `test-helpers` feature:
//!
//! ```toml
//! [dev-dependencies]
//! admission-gate = { version = "*", features = ["test-helpers"] }
//! ```

use crate::application::ports::Clock;
use std::time::Instant;

/// Monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
