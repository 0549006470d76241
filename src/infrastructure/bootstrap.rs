//! Composition root: opens tenant databases and starts background jobs.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::adapter::outbound::pricing::RandomWalk;
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::application::schedule;
use crate::application::{CleanupJob, PriceTicker, TenantContext, TenantRegistry};
use crate::domain::TenantId;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::{Clock, PricingStrategy};

/// Open one tenant's database, apply migrations and warm its caches.
///
/// # Errors
/// Returns an error if the database cannot be opened or read.
pub async fn open_tenant(
    config: &Config,
    id: TenantId,
    clock: Arc<dyn Clock>,
) -> Result<TenantContext<SqliteStore>> {
    let path = config.database.tenant_path(&id);
    let store = SqliteStore::open(&path, config.database.pool_size)?;
    TenantContext::open(id, store, &config.ledger, clock).await
}

/// Open every configured tenant into a fresh registry.
///
/// # Errors
/// Fails on the first tenant that cannot be opened.
pub async fn open_registry(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<Arc<TenantRegistry<SqliteStore>>> {
    let registry = Arc::new(TenantRegistry::new());
    for id in config.tenant_ids() {
        let context = open_tenant(config, id, Arc::clone(&clock)).await?;
        registry.register(context);
    }
    info!(tenants = registry.len(), "Tenants opened");
    Ok(registry)
}

/// Running background jobs and the switch that stops them.
pub struct Jobs {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Jobs {
    /// Number of jobs started.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every job and wait for it to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Job ended abnormally");
            }
        }
    }
}

/// Start the enabled jobs over `registry`.
///
/// # Errors
/// Returns an error if the ticker schedule is invalid.
pub fn spawn_jobs(
    config: &Config,
    registry: Arc<TenantRegistry<SqliteStore>>,
    strategy: Arc<dyn PricingStrategy>,
    clock: Arc<dyn Clock>,
) -> Result<Jobs> {
    let (shutdown, receiver) = watch::channel(false);
    let mut handles = Vec::new();

    if config.ticker.enabled {
        let ticker = Arc::new(PriceTicker::new(Arc::clone(&registry), strategy));
        handles.push(schedule::spawn(
            ticker,
            config.ticker.schedule()?,
            Arc::clone(&clock),
            receiver.clone(),
        ));
    }

    if config.cleanup.enabled {
        let cleanup = Arc::new(CleanupJob::new(
            Arc::clone(&registry),
            config.cleanup.retention(),
            Arc::clone(&clock),
        ));
        handles.push(schedule::spawn(
            cleanup,
            config.cleanup.schedule(),
            clock,
            receiver,
        ));
    }

    Ok(Jobs { shutdown, handles })
}

/// Build the default pricing strategy from the ticker settings.
///
/// # Errors
/// Returns an error if the step percentage is out of range.
pub fn default_strategy(config: &Config) -> Result<Arc<dyn PricingStrategy>> {
    let walk = RandomWalk::new(config.ticker.max_step_percent, config.ticker.initial_price)?;
    Ok(Arc::new(walk))
}
