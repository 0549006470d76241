//! Supervised periodic jobs.
//!
//! A job runs on a fixed period, optionally only inside active hours. Each
//! tick runs in its own task and is awaited before the next tick may start,
//! so ticks never overlap; a panic or timeout ends that tick only.

mod cleanup;
mod ticker;

pub use cleanup::CleanupJob;
pub use ticker::PriceTicker;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::port::Clock;

/// Outcome counts of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl TickReport {
    pub fn record<T, E>(&mut self, outcome: &std::result::Result<T, E>) {
        if outcome.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn merge(&mut self, other: TickReport) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

/// Work run once per tick.
///
/// Failures are handled inside the job and reported through the
/// [`TickReport`]; the runner only sees panics and timeouts.
pub trait ScheduledJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn run_once(&self) -> impl Future<Output = TickReport> + Send;
}

/// Local hours during which a job runs, as `[open_hour, close_hour)`.
///
/// `open_hour > close_hour` spans midnight; equal hours mean always open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHours {
    pub open_hour: u32,
    pub close_hour: u32,
    pub offset: FixedOffset,
}

impl ActiveHours {
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        let hour = now.with_timezone(&self.offset).hour();
        match self.open_hour.cmp(&self.close_hour) {
            std::cmp::Ordering::Less => (self.open_hour..self.close_hour).contains(&hour),
            std::cmp::Ordering::Greater => hour >= self.open_hour || hour < self.close_hour,
            std::cmp::Ordering::Equal => true,
        }
    }
}

/// When and for how long a job may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub every: Duration,
    pub active_hours: Option<ActiveHours>,
    /// Ticks running longer than this are abandoned.
    pub timeout: Option<Duration>,
}

impl Schedule {
    pub fn every(every: Duration) -> Self {
        Self {
            every,
            active_hours: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_active_hours(mut self, hours: ActiveHours) -> Self {
        self.active_hours = Some(hours);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.active_hours.map_or(true, |hours| hours.contains(now))
    }
}

/// Run one tick of `job` in its own task.
///
/// Returns `None` when the tick panicked or ran past `timeout`.
pub async fn run_tick<J: ScheduledJob>(
    job: &Arc<J>,
    timeout: Option<Duration>,
) -> Option<TickReport> {
    let task_job = Arc::clone(job);
    let mut handle = tokio::spawn(async move { task_job.run_once().await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                warn!(
                    job = job.name(),
                    timeout_ms = limit.as_millis() as u64,
                    "Tick timed out, abandoned"
                );
                return None;
            }
        },
        None => handle.await,
    };

    match joined {
        Ok(report) => {
            debug!(
                job = job.name(),
                succeeded = report.succeeded,
                failed = report.failed,
                "Tick finished"
            );
            Some(report)
        }
        Err(e) => {
            error!(job = job.name(), error = %e, "Tick aborted");
            None
        }
    }
}

/// Drive `job` on `schedule` until `shutdown` turns true or its sender is
/// dropped. Missed ticks are skipped, not replayed.
pub fn spawn<J: ScheduledJob>(
    job: Arc<J>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            job = job.name(),
            every_ms = schedule.every.as_millis() as u64,
            "Job started"
        );
        let mut interval = tokio::time::interval(schedule.every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!(job = job.name(), "Job stopping");
                        break;
                    }
                }
                _ = interval.tick() => {
                    if !schedule.is_active(clock.now()) {
                        debug!(job = job.name(), "Outside active hours, tick skipped");
                        continue;
                    }
                    run_tick(&job, schedule.timeout).await;
                }
            }
        }
    })
}
