//! Wall-clock time effects
//!
//! Timers (debounce, backoff, periodic sweeps) use `tokio::time` directly so
//! tests can pause and advance them; only timestamps stored on records go
//! through [`TimeSource`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of wall-clock timestamps
pub trait TimeSource: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Blanket implementation for Arc<T> where T: TimeSource
impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Real system clock for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for testing and simulation
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl SimulatedClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock
    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.current.lock();
        *current += by;
    }

    /// Advance the clock by whole hours
    pub fn advance_hours(&self, hours: i64) {
        self.advance(chrono::Duration::hours(hours));
    }

    /// Advance the clock by whole days
    pub fn advance_days(&self, days: i64) {
        self.advance(chrono::Duration::days(days));
    }

    /// Jump to an absolute time
    pub fn set(&self, to: DateTime<Utc>) {
        *self.current.lock() = to;
    }
}

impl TimeSource for SimulatedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}
