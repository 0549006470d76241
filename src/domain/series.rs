//! Append-only asset price series.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::id::AssetId;
use super::record::Record;

/// One immutable price observation. `(asset_id, created_at)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub asset_id: AssetId,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields of a new price point. Missing fields take their defaults:
/// price 0, created now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricePatch {
    pub price: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PricePatch {
    /// A price-only write stamped at append time.
    #[must_use]
    pub fn price(price: i64) -> Self {
        Self {
            price: Some(price),
            created_at: None,
        }
    }
}

impl Record for PricePoint {
    type Key = AssetId;
    type Patch = PricePatch;

    fn key(&self) -> &AssetId {
        &self.asset_id
    }

    fn create(key: AssetId, patch: &PricePatch, now: DateTime<Utc>) -> Self {
        Self {
            asset_id: key,
            price: patch.price.unwrap_or(0).max(0),
            created_at: patch.created_at.unwrap_or(now),
        }
    }

    fn apply(&mut self, patch: &PricePatch) {
        if let Some(price) = patch.price {
            self.price = price.max(0);
        }
        if let Some(at) = patch.created_at {
            self.created_at = at;
        }
    }
}

/// Pick the append timestamp for a new point so the series stays strictly
/// increasing even if the clock stalls or steps backwards.
#[must_use]
pub fn next_timestamp(
    requested: DateTime<Utc>,
    latest: Option<&DateTime<Utc>>,
) -> DateTime<Utc> {
    match latest {
        Some(latest) if requested <= *latest => *latest + Duration::microseconds(1),
        _ => requested,
    }
}

/// Fixed-capacity, most-recent-first window of the newest points.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl SlidingWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Seed a window from points already ordered most-recent-first.
    #[must_use]
    pub fn seeded(capacity: usize, points: impl IntoIterator<Item = PricePoint>) -> Self {
        let mut window = Self::new(capacity);
        window
            .points
            .extend(points.into_iter().take(window.capacity));
        window
    }

    /// Prepend the newest point, evicting the oldest once full.
    pub fn push(&mut self, point: PricePoint) {
        if self.points.len() == self.capacity {
            self.points.pop_back();
        }
        self.points.push_front(point);
    }

    #[must_use]
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the window, most recent first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<PricePoint> {
        self.points.iter().cloned().collect()
    }
}
