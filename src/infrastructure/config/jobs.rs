//! Background job configuration.

use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

use crate::application::{ActiveHours, Schedule};
use crate::error::{ConfigError, Result};

/// Price ticker configuration, read from the `[ticker]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between ticks (default: 60).
    #[serde(default = "default_ticker_interval_secs")]
    pub interval_secs: u64,
    /// First local hour in which prices move.
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,
    /// Local hour at which prices stop moving. Equal to `open_hour` means
    /// the market never closes.
    #[serde(default = "default_close_hour")]
    pub close_hour: u32,
    /// Offset of the market's local time from UTC, in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// A tick running longer than this is abandoned (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Largest move per tick as a percentage of the current price.
    #[serde(default = "default_max_step_percent")]
    pub max_step_percent: f64,
    /// Price quoted for an asset with no history.
    #[serde(default = "default_initial_price")]
    pub initial_price: i64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_ticker_interval_secs() -> u64 {
    60
}

const fn default_open_hour() -> u32 {
    9
}

const fn default_close_hour() -> u32 {
    17
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_step_percent() -> f64 {
    5.0
}

const fn default_initial_price() -> i64 {
    100
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_ticker_interval_secs(),
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            utc_offset_minutes: 0,
            timeout_secs: default_timeout_secs(),
            max_step_percent: default_max_step_percent(),
            initial_price: default_initial_price(),
        }
    }
}

impl TickerConfig {
    /// Build the ticker's run schedule.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for an out-of-range offset.
    #[allow(clippy::result_large_err)]
    pub fn schedule(&self) -> Result<Schedule> {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).ok_or_else(
            || ConfigError::InvalidValue {
                field: "ticker.utc_offset_minutes",
                reason: "must be within one day of UTC".to_string(),
            },
        )?;
        Ok(Schedule::every(Duration::from_secs(self.interval_secs))
            .with_active_hours(ActiveHours {
                open_hour: self.open_hour,
                close_hour: self.close_hour,
                offset,
            })
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }

    #[allow(clippy::result_large_err)]
    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ticker.interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ticker.timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.open_hour > 23 || self.close_hour > 23 {
            return Err(ConfigError::InvalidValue {
                field: "ticker.open_hour",
                reason: "hours must be between 0 and 23".to_string(),
            }
            .into());
        }
        if !(0.0..=100.0).contains(&self.max_step_percent) {
            return Err(ConfigError::InvalidValue {
                field: "ticker.max_step_percent",
                reason: "must be between 0 and 100".to_string(),
            }
            .into());
        }
        if self.initial_price < 0 {
            return Err(ConfigError::InvalidValue {
                field: "ticker.initial_price",
                reason: "must not be negative".to_string(),
            }
            .into());
        }
        self.schedule().map(|_| ())
    }
}

/// Cleanup job configuration, read from the `[cleanup]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between runs (default: one day).
    #[serde(default = "default_cleanup_interval_secs")]
    pub interval_secs: u64,
    /// Price rows older than this many days are pruned. The default covers
    /// the longest history lookback.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

const fn default_cleanup_interval_secs() -> u64 {
    86_400
}

const fn default_retention_days() -> u32 {
    186
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_cleanup_interval_secs(),
            retention_days: default_retention_days(),
        }
    }
}

impl CleanupConfig {
    #[must_use]
    pub fn schedule(&self) -> Schedule {
        Schedule::every(Duration::from_secs(self.interval_secs))
    }

    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    #[allow(clippy::result_large_err)]
    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cleanup.interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.retention_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cleanup.retention_days",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
