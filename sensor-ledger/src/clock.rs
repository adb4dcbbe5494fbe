//! Acceptance-time source
//!
//! Reading timestamps are assigned by the ledger, never by the submitter.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of acceptance timestamps
pub trait Clock: Send + Sync + 'static {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that advances by a fixed step on every call
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    /// Start at `start`, advancing `step` per reading
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock();
        let now = *next;
        *next = now + self.step;
        now
    }
}
