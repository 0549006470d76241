//! Per-user command cooldowns.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CommandId, UserId};

/// A cooldown started when `user_id` last ran `command_id` successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    pub user_id: UserId,
    pub command_id: CommandId,
    pub start_time: DateTime<Utc>,
}

impl Cooldown {
    /// Time left before the command may run again.
    ///
    /// `cooldown_time - (now - start_time)`; zero or negative once expired.
    #[must_use]
    pub fn remaining(&self, cooldown_ms: i64, now: DateTime<Utc>) -> Duration {
        Duration::milliseconds(cooldown_ms) - (now - self.start_time)
    }
}

/// Gate state of one (user, command) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    /// No cooldown row, or the last one has run out.
    Idle,
    /// The command is blocked for `remaining` longer.
    Cooling { remaining: Duration },
}

impl CooldownState {
    #[must_use]
    pub fn from_remaining(remaining: Duration) -> Self {
        if remaining > Duration::zero() {
            Self::Cooling { remaining }
        } else {
            Self::Idle
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Render a wait as `1h 2m 3s`, omitting leading zero units.
#[must_use]
pub fn format_wait(remaining: &Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m {s}s"),
        _ => format!("{h}h {m}m {s}s"),
    }
}
