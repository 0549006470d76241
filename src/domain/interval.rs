//! History intervals and last-value-per-bucket downsampling.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::series::PricePoint;

/// Resolution of a history query.
///
/// `Minute` is the finest resolution and the one served from the sliding
/// window cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryInterval {
    #[default]
    Minute,
    Hour,
    Day,
    Month,
}

impl HistoryInterval {
    pub const ALL: [Self; 4] = [Self::Minute, Self::Hour, Self::Day, Self::Month];

    /// Oldest timestamp included in a query issued at `now`.
    ///
    /// Minute looks back 60 minutes, hour 24 hours, day 30 days and
    /// month 6 calendar months.
    #[must_use]
    pub fn lookback_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Minute => now - Duration::minutes(60),
            Self::Hour => now - Duration::hours(24),
            Self::Day => now - Duration::days(30),
            Self::Month => now
                .checked_sub_months(Months::new(6))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// `strftime` pattern that truncates a timestamp to its calendar bucket.
    ///
    /// The same pattern is used by SQLite's `strftime` and chrono's
    /// formatter, so in-process and in-database bucketing agree.
    #[must_use]
    pub const fn bucket_format(self) -> &'static str {
        match self {
            Self::Minute => "%Y-%m-%dT%H:%M",
            Self::Hour => "%Y-%m-%dT%H",
            Self::Day => "%Y-%m-%d",
            Self::Month => "%Y-%m",
        }
    }

    /// Calendar bucket that `at` falls in.
    #[must_use]
    pub fn bucket(self, at: &DateTime<Utc>) -> String {
        at.format(self.bucket_format()).to_string()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for HistoryInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute" | "now" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            _ => Err(ValidationError::InvalidInterval {
                value: s.to_string(),
            }),
        }
    }
}

/// Keep the latest point of every calendar bucket at or after `since`.
///
/// The result is ordered most recent first and holds at most one point per
/// bucket, however many points were written into it.
#[must_use]
pub fn downsample(
    points: impl IntoIterator<Item = PricePoint>,
    interval: HistoryInterval,
    since: DateTime<Utc>,
) -> Vec<PricePoint> {
    let mut buckets: HashMap<String, PricePoint> = HashMap::new();
    for point in points.into_iter().filter(|p| p.created_at >= since) {
        let key = interval.bucket(&point.created_at);
        match buckets.get(&key) {
            Some(kept) if kept.created_at >= point.created_at => {}
            _ => {
                buckets.insert(key, point);
            }
        }
    }

    let mut out: Vec<PricePoint> = buckets.into_values().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}
