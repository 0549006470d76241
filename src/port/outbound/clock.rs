//! Wall-clock port.

use chrono::{DateTime, SubsecRound, Utc};

/// Source of the current time.
///
/// Timestamps are persisted with microsecond precision, so implementations
/// return instants already truncated to microseconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}
