//! Handler for the `run` command.

use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};

use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;
use crate::port::{Clock, SystemClock};

/// Execute the run command.
///
/// Runs until Ctrl-C, then stops the jobs and waits for in-flight ticks.
pub async fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    config.init_logging();

    info!(
        config = %config_path.display(),
        data_dir = %config.database.data_dir.display(),
        "Starting merchant"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = bootstrap::open_registry(&config, Arc::clone(&clock)).await?;
    let strategy = bootstrap::default_strategy(&config)?;
    let jobs = bootstrap::spawn_jobs(&config, registry, strategy, clock)?;
    info!(jobs = jobs.len(), "Jobs running");

    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    jobs.shutdown().await;
    info!("Stopped");
    Ok(())
}
