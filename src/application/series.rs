//! Asset price series with a latest-point cache and a per-asset sliding
//! window of recent points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::application::cache::CacheAsideStore;
use crate::application::ledger::UserLedger;
use crate::domain::series::next_timestamp;
use crate::domain::{AssetId, HistoryInterval, PricePatch, PricePoint, Record, SlidingWindow};
use crate::error::{LogPersistence, Result};
use crate::port::{AssetTable, Clock, Storage, Table};

pub struct StockTimeSeriesStore<S: Storage> {
    latest: CacheAsideStore<PricePoint, S>,
    windows: DashMap<AssetId, SlidingWindow>,
    window_size: usize,
    ledger: Arc<UserLedger<S>>,
    clock: Arc<dyn Clock>,
    /// Set once the latest cache holds every asset.
    warmed: AtomicBool,
}

impl<S: Storage> StockTimeSeriesStore<S> {
    pub fn new(
        storage: S,
        ledger: Arc<UserLedger<S>>,
        window_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            latest: CacheAsideStore::new(storage, clock.clone()),
            windows: DashMap::new(),
            window_size: window_size.max(1),
            ledger,
            clock,
            warmed: AtomicBool::new(false),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Latest point of `asset_id`.
    pub async fn get(&self, asset_id: &AssetId) -> Result<Option<PricePoint>> {
        self.latest.get(asset_id).await.log_persistence("load price")
    }

    pub async fn latest(&self, asset_id: &AssetId) -> Result<Option<PricePoint>> {
        self.get(asset_id).await
    }

    /// Append a point to the series.
    ///
    /// The owning account is created if needed. A timestamp at or before the
    /// current latest point is moved just past it, so every append becomes
    /// the new latest.
    pub async fn set(&self, asset_id: &AssetId, patch: &PricePatch) -> Result<PricePoint> {
        self.ledger.ensure_account(&asset_id.owner()).await?;

        let _guard = self.latest.lock(asset_id).await;
        let current = self.get(asset_id).await?;
        let requested = patch.created_at.unwrap_or_else(|| self.clock.now());
        let created_at = next_timestamp(requested, current.as_ref().map(|p| &p.created_at));
        let point = PricePoint::create(
            asset_id.clone(),
            &PricePatch {
                price: patch.price,
                created_at: Some(created_at),
            },
            created_at,
        );

        let stored = self
            .latest
            .insert(point)
            .await
            .log_persistence("append price")?;
        self.windows
            .entry(asset_id.clone())
            .or_insert_with(|| SlidingWindow::new(self.window_size))
            .push(stored.clone());
        debug!(asset = %asset_id, price = stored.price, "Price appended");
        Ok(stored)
    }

    /// Append `amount` (floored at zero) as the asset's new price.
    pub async fn update_price(&self, asset_id: &AssetId, amount: i64) -> Result<PricePoint> {
        self.set(asset_id, &PricePatch::price(amount.max(0))).await
    }

    /// Latest point of every asset, most recent first.
    pub async fn all_latest(&self) -> Result<Vec<PricePoint>> {
        let mut points = if self.warmed.load(Ordering::Acquire) {
            self.latest.cached_rows()
        } else {
            Table::<PricePoint>::load_all(self.latest.table())
                .await
                .log_persistence("load latest prices")?
        };
        points.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(points)
    }

    /// Downsampled history of `asset_id`, most recent first.
    ///
    /// Minute resolution is served from the sliding window when one exists.
    pub async fn history(
        &self,
        asset_id: &AssetId,
        interval: HistoryInterval,
    ) -> Result<Vec<PricePoint>> {
        if interval == HistoryInterval::Minute {
            let window = self.windows.get(asset_id).map(|w| w.to_vec());
            if let Some(points) = window {
                return Ok(points);
            }
        }
        let since = interval.lookback_start(self.clock.now());
        self.latest
            .table()
            .history(asset_id, interval, since)
            .await
            .log_persistence("load price history")
    }

    /// Shares of `asset_id` bought so far.
    pub async fn total_purchased(&self, asset_id: &AssetId) -> Result<i64> {
        self.latest
            .table()
            .total_purchased(asset_id)
            .await
            .log_persistence("sum positions")
    }

    /// Load the latest point of every asset and seed each window from its
    /// minute history.
    pub async fn refresh_cache(&self) -> Result<usize> {
        let assets = self.latest.refresh_cache().await?;
        let since = HistoryInterval::Minute.lookback_start(self.clock.now());
        self.windows.clear();
        for point in self.latest.cached_rows() {
            let recent = self
                .latest
                .table()
                .history(&point.asset_id, HistoryInterval::Minute, since)
                .await?;
            let seed = if recent.is_empty() { vec![point.clone()] } else { recent };
            self.windows
                .insert(point.asset_id.clone(), SlidingWindow::seeded(self.window_size, seed));
        }
        self.warmed.store(true, Ordering::Release);
        Ok(assets)
    }

    /// Delete points older than `cutoff`, keeping each asset's latest.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.latest
            .table()
            .prune_before(cutoff)
            .await
            .log_persistence("prune prices")
    }
}
