//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Clock whose time only moves when a test says so.
///
/// Clones share the same time, so a gate built with one clone can be
/// driven from the test through another.
///
/// ```
/// use admission_gate::infrastructure::mocks::MockClock;
/// use admission_gate::application::ports::Clock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// let shared = clock.clone();
///
/// shared.advance(Duration::from_secs(61));
/// assert_eq!(clock.now(), start + Duration::from_secs(61));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock reading `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.with_time(|now| *now += duration);
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: Instant) {
        self.with_time(|now| *now = instant);
    }

    fn with_time<R>(&self, f: impl FnOnce(&mut Instant) -> R) -> R {
        let mut now = self
            .now
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        f(&mut now)
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.with_time(|now| *now)
    }
}
