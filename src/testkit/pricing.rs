//! Deterministic pricing strategy.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{AssetId, PricePoint};
use crate::error::{Error, Result};
use crate::port::PricingStrategy;

/// Prices assets from a script instead of a model.
///
/// Scripted assets always get their fixed price; assets marked failing
/// always error and those marked panicking panic; anything else moves by
/// `step` from its latest price.
#[derive(Debug, Default)]
pub struct ScriptedPricing {
    fixed: HashMap<AssetId, i64>,
    failing: HashSet<AssetId>,
    panicking: HashSet<AssetId>,
    step: i64,
    calls: AtomicUsize,
}

impl ScriptedPricing {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_price(mut self, asset_id: &str, price: i64) -> Self {
        self.fixed.insert(AssetId::new(asset_id), price);
        self
    }

    #[must_use]
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    #[must_use]
    pub fn failing_for(mut self, asset_id: &str) -> Self {
        self.failing.insert(AssetId::new(asset_id));
        self
    }

    /// Panic instead of pricing `asset_id`, like a buggy strategy would.
    #[must_use]
    pub fn panicking_for(mut self, asset_id: &str) -> Self {
        self.panicking.insert(AssetId::new(asset_id));
        self
    }

    /// Number of prices requested so far, failures included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PricingStrategy for ScriptedPricing {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn next_price(&self, asset_id: &AssetId, history: &[PricePoint]) -> Result<i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panicking.contains(asset_id) {
            panic!("scripted panic for {asset_id}");
        }
        if self.failing.contains(asset_id) {
            return Err(Error::Pricing(format!("no script for {asset_id}")));
        }
        if let Some(price) = self.fixed.get(asset_id) {
            return Ok(*price);
        }
        let latest = history.first().map_or(0, |p| p.price);
        Ok(latest.saturating_add(self.step))
    }
}
