//! Periodic price updates for every tracked asset.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::FutureExt;
use tracing::{info, warn};

use super::{ScheduledJob, TickReport};
use crate::application::tenant::{TenantContext, TenantRegistry};
use crate::domain::{AssetId, HistoryInterval, PricePoint};
use crate::error::{Error, Result};
use crate::port::{PricingStrategy, Storage};

/// Moves the price of every asset with a recorded price, in every tenant.
///
/// Assets are updated concurrently and independently: one asset failing, or
/// its strategy panicking, is logged and counted without affecting the rest
/// of the tick.
pub struct PriceTicker<S: Storage> {
    registry: Arc<TenantRegistry<S>>,
    strategy: Arc<dyn PricingStrategy>,
}

impl<S: Storage> PriceTicker<S> {
    pub fn new(registry: Arc<TenantRegistry<S>>, strategy: Arc<dyn PricingStrategy>) -> Self {
        Self { registry, strategy }
    }

    async fn update_asset(
        &self,
        tenant: &TenantContext<S>,
        asset_id: &AssetId,
    ) -> Result<PricePoint> {
        let history = tenant.series().history(asset_id, HistoryInterval::Minute).await?;
        let price = self.strategy.next_price(asset_id, &history)?;
        tenant.series().update_price(asset_id, price).await
    }

    /// [`Self::update_asset`] with a panic turned into a failed update.
    async fn isolated_update(
        &self,
        tenant: &TenantContext<S>,
        asset_id: &AssetId,
    ) -> Result<PricePoint> {
        AssertUnwindSafe(self.update_asset(tenant, asset_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(Error::Pricing(format!(
                    "price update panicked: {}",
                    panic_message(&*panic)
                )))
            })
    }

    /// Update every asset of one tenant.
    pub async fn tick_tenant(&self, tenant: &TenantContext<S>) -> TickReport {
        let mut report = TickReport::default();
        let assets = match tenant.series().all_latest().await {
            Ok(assets) => assets,
            Err(e) => {
                warn!(tenant = %tenant.id(), error = %e, "Failed to list assets");
                report.failed += 1;
                return report;
            }
        };

        let outcomes = join_all(
            assets
                .iter()
                .map(|point| self.isolated_update(tenant, &point.asset_id)),
        )
        .await;

        for (point, outcome) in assets.iter().zip(&outcomes) {
            if let Err(e) = outcome {
                warn!(
                    tenant = %tenant.id(),
                    asset = %point.asset_id,
                    strategy = self.strategy.name(),
                    error = %e,
                    "Price update failed"
                );
            }
            report.record(outcome);
        }

        info!(
            tenant = %tenant.id(),
            updated = report.succeeded,
            failed = report.failed,
            "Price tick complete"
        );
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl<S: Storage> ScheduledJob for PriceTicker<S> {
    fn name(&self) -> &'static str {
        "price-ticker"
    }

    async fn run_once(&self) -> TickReport {
        let mut report = TickReport::default();
        for tenant in self.registry.all() {
            report.merge(self.tick_tenant(&tenant).await);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::application::settings::EconomySettings;
    use crate::domain::TenantId;
    use crate::testkit::{ManualClock, ScriptedPricing};

    async fn registry_with(assets: &[(&str, i64)]) -> Arc<TenantRegistry<MemoryStore>> {
        let registry = Arc::new(TenantRegistry::new());
        let context = TenantContext::open(
            TenantId::new("t"),
            MemoryStore::new(),
            &EconomySettings::default(),
            Arc::new(ManualClock::default()),
        )
        .await
        .unwrap();
        for (asset, price) in assets {
            context
                .series()
                .update_price(&AssetId::new(*asset), *price)
                .await
                .unwrap();
        }
        registry.register(context);
        registry
    }

    #[tokio::test]
    async fn one_failing_asset_does_not_stop_the_others() {
        let registry = registry_with(&[("a", 10), ("b", 20), ("c", 30)]).await;
        let pricing = ScriptedPricing::new().with_step(1).failing_for("b");
        let ticker = PriceTicker::new(registry.clone(), Arc::new(pricing));

        let report = ticker.run_once().await;
        assert_eq!(report, TickReport { succeeded: 2, failed: 1 });

        let tenant = registry.get(&TenantId::new("t")).unwrap();
        let price = |id: &'static str| {
            let tenant = tenant.clone();
            async move { tenant.series().latest(&AssetId::new(id)).await.unwrap().unwrap().price }
        };
        assert_eq!(price("a").await, 11);
        assert_eq!(price("b").await, 20);
        assert_eq!(price("c").await, 31);
    }

    #[tokio::test]
    async fn panicking_strategy_fails_only_its_asset() {
        let registry = registry_with(&[("a", 10), ("b", 20), ("c", 30)]).await;
        let pricing = ScriptedPricing::new().with_step(1).panicking_for("a");
        let ticker = PriceTicker::new(registry.clone(), Arc::new(pricing));

        let report = ticker.run_once().await;
        assert_eq!(report, TickReport { succeeded: 2, failed: 1 });

        let tenant = registry.get(&TenantId::new("t")).unwrap();
        let latest = tenant.series().latest(&AssetId::new("b")).await.unwrap().unwrap();
        assert_eq!(latest.price, 21);
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&7_u8), "unknown panic");
    }

    #[tokio::test]
    async fn empty_tenants_tick_cleanly() {
        let registry = registry_with(&[]).await;
        let ticker = PriceTicker::new(registry, Arc::new(ScriptedPricing::new()));
        assert_eq!(ticker.run_once().await, TickReport::default());
    }
}
