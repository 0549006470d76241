//! Storage hygiene: expired cooldowns and price history past retention.

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use super::{ScheduledJob, TickReport};
use crate::application::tenant::{TenantContext, TenantRegistry};
use crate::port::{Clock, Storage};

pub struct CleanupJob<S: Storage> {
    registry: Arc<TenantRegistry<S>>,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl<S: Storage> CleanupJob<S> {
    pub fn new(
        registry: Arc<TenantRegistry<S>>,
        retention: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            retention,
            clock,
        }
    }

    async fn clean_tenant(&self, tenant: &TenantContext<S>) -> TickReport {
        let mut report = TickReport::default();

        let cooldowns = tenant.ledger().prune_expired_cooldowns().await;
        if let Err(e) = &cooldowns {
            warn!(tenant = %tenant.id(), error = %e, "Cooldown cleanup failed");
        }
        report.record(&cooldowns);

        let cutoff = self.clock.now() - self.retention;
        let prices = tenant.series().prune_before(cutoff).await;
        if let Err(e) = &prices {
            warn!(tenant = %tenant.id(), error = %e, "Price history cleanup failed");
        }
        report.record(&prices);

        info!(
            tenant = %tenant.id(),
            cooldowns = cooldowns.unwrap_or(0),
            prices = prices.unwrap_or(0),
            "Cleanup complete"
        );
        report
    }
}

impl<S: Storage> ScheduledJob for CleanupJob<S> {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    async fn run_once(&self) -> TickReport {
        let mut report = TickReport::default();
        for tenant in self.registry.all() {
            report.merge(self.clean_tenant(&tenant).await);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::application::settings::EconomySettings;
    use crate::domain::{AssetId, CommandId, CommandPatch, PricePatch, TenantId, UserId};
    use crate::testkit::ManualClock;

    #[tokio::test]
    async fn prunes_old_prices_and_expired_cooldowns() {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::default());
        let context = TenantContext::open(
            TenantId::new("t"),
            store.clone(),
            &EconomySettings::default(),
            clock.clone(),
        )
        .await
        .unwrap();

        let asset = AssetId::new("a");
        let start = clock.now();
        for day in 0..3 {
            context
                .series()
                .set(
                    &asset,
                    &PricePatch {
                        price: Some(day),
                        created_at: Some(start + Duration::days(day)),
                    },
                )
                .await
                .unwrap();
        }

        let work = CommandId::new("work");
        context
            .catalog()
            .register_command(
                &work,
                &CommandPatch {
                    cooldown_ms: Some(1_000),
                    ..CommandPatch::default()
                },
            )
            .await
            .unwrap();
        context
            .ledger()
            .create_cooldown(&UserId::new("u"), &work)
            .await
            .unwrap();

        let registry = Arc::new(TenantRegistry::new());
        registry.register(context);
        clock.advance(Duration::days(200));
        let job = CleanupJob::new(registry, Duration::days(186), clock);

        let report = job.run_once().await;
        assert_eq!(report, TickReport { succeeded: 2, failed: 0 });
        assert_eq!(store.price_rows(&asset), 1);
        assert!(crate::port::UserTable::cooldowns(&store).await.unwrap().is_empty());
    }
}
