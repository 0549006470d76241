//! Per-tenant wiring of the economy services.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::application::catalog::Catalog;
use crate::application::gate::CooldownGate;
use crate::application::ledger::UserLedger;
use crate::application::series::StockTimeSeriesStore;
use crate::application::settings::EconomySettings;
use crate::application::trade::Trader;
use crate::domain::TenantId;
use crate::error::Result;
use crate::port::{Clock, Storage};

/// Everything one tenant's economy runs on, built over a single storage
/// backend.
pub struct TenantContext<S: Storage> {
    id: TenantId,
    storage: S,
    catalog: Arc<Catalog<S>>,
    ledger: Arc<UserLedger<S>>,
    series: Arc<StockTimeSeriesStore<S>>,
    gate: CooldownGate<S>,
    trader: Trader<S>,
}

impl<S: Storage> TenantContext<S> {
    /// Build the services without touching storage.
    pub fn new(
        id: TenantId,
        storage: S,
        settings: &EconomySettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let catalog = Arc::new(Catalog::new(storage.clone(), clock.clone()));
        let ledger = Arc::new(UserLedger::new(storage.clone(), catalog.clone(), clock.clone()));
        let series = Arc::new(StockTimeSeriesStore::new(
            storage.clone(),
            ledger.clone(),
            settings.window_size,
            clock,
        ));
        let gate = CooldownGate::new(ledger.clone(), catalog.clone());
        let trader = Trader::new(
            ledger.clone(),
            catalog.clone(),
            series.clone(),
            settings.inventory_capacity,
        );
        Self {
            id,
            storage,
            catalog,
            ledger,
            series,
            gate,
            trader,
        }
    }

    /// Build the services and warm every cache from storage.
    pub async fn open(
        id: TenantId,
        storage: S,
        settings: &EconomySettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let context = Self::new(id, storage, settings, clock);
        context.refresh_cache().await?;
        Ok(context)
    }

    /// Reload every cache of this tenant. Startup only.
    pub async fn refresh_cache(&self) -> Result<()> {
        let (items, commands) = self.catalog.refresh_cache().await?;
        let users = self.ledger.refresh_cache().await?;
        let assets = self.series.refresh_cache().await?;
        info!(tenant = %self.id, users, items, commands, assets, "Tenant caches loaded");
        Ok(())
    }

    pub fn id(&self) -> &TenantId {
        &self.id
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn ledger(&self) -> &UserLedger<S> {
        &self.ledger
    }

    pub fn series(&self) -> &StockTimeSeriesStore<S> {
        &self.series
    }

    pub fn gate(&self) -> &CooldownGate<S> {
        &self.gate
    }

    pub fn trader(&self) -> &Trader<S> {
        &self.trader
    }
}

/// The set of live tenants.
pub struct TenantRegistry<S: Storage> {
    tenants: RwLock<HashMap<TenantId, Arc<TenantContext<S>>>>,
}

impl<S: Storage> TenantRegistry<S> {
    pub fn new() -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Add a tenant, replacing any context registered under the same id.
    pub fn register(&self, context: TenantContext<S>) -> Arc<TenantContext<S>> {
        let context = Arc::new(context);
        self.tenants
            .write()
            .insert(context.id().clone(), context.clone());
        context
    }

    /// Drop a tenant. Jobs already holding its context finish their tick.
    pub fn remove(&self, id: &TenantId) -> Option<Arc<TenantContext<S>>> {
        self.tenants.write().remove(id)
    }

    pub fn get(&self, id: &TenantId) -> Option<Arc<TenantContext<S>>> {
        self.tenants.read().get(id).cloned()
    }

    /// Snapshot of every registered tenant, ordered by id.
    pub fn all(&self) -> Vec<Arc<TenantContext<S>>> {
        let mut all: Vec<_> = self.tenants.read().values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    pub fn len(&self) -> usize {
        self.tenants.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.read().is_empty()
    }
}

impl<S: Storage> Default for TenantRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::{AssetId, UserId};
    use crate::port::SystemClock;

    #[tokio::test]
    async fn tenants_are_isolated() {
        let registry = TenantRegistry::new();
        for id in ["alpha", "beta"] {
            let context = TenantContext::open(
                TenantId::new(id),
                MemoryStore::new(),
                &EconomySettings::default(),
                Arc::new(SystemClock),
            )
            .await
            .unwrap();
            registry.register(context);
        }

        let alpha = registry.get(&TenantId::new("alpha")).unwrap();
        let u = UserId::new("u");
        alpha.ledger().add_balance(&u, 10).await.unwrap();

        let beta = registry.get(&TenantId::new("beta")).unwrap();
        assert_eq!(beta.ledger().balance(&u).await.unwrap(), 0);
        assert_eq!(alpha.ledger().balance(&u).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn open_warms_existing_state() {
        let store = MemoryStore::new();
        let settings = EconomySettings::default();
        let clock = Arc::new(SystemClock);
        let first = TenantContext::open(TenantId::new("t"), store.clone(), &settings, clock.clone())
            .await
            .unwrap();
        first.series().update_price(&AssetId::new("a"), 42).await.unwrap();

        let reopened = TenantContext::open(TenantId::new("t"), store, &settings, clock)
            .await
            .unwrap();
        let latest = reopened.series().all_latest().await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].price, 42);
    }

    #[tokio::test]
    async fn removed_tenants_are_gone() {
        let registry = TenantRegistry::new();
        registry.register(TenantContext::new(
            TenantId::new("t"),
            MemoryStore::new(),
            &EconomySettings::default(),
            Arc::new(SystemClock),
        ));

        assert!(registry.remove(&TenantId::new("t")).is_some());
        assert!(registry.is_empty());
        assert!(registry.all().is_empty());
    }
}
