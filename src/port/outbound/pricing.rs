//! Pricing strategy port.

use crate::domain::{AssetId, PricePoint};
use crate::error::Result;

/// Produces the next price of an asset from its recent history.
///
/// `history` is ordered most recent first and may be empty. Implementations
/// must return a non-negative price; the series clamps anything below zero
/// regardless.
pub trait PricingStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Compute the next price for `asset_id`.
    ///
    /// # Errors
    /// Returns an error when no price can be produced for this asset; the
    /// scheduler logs it and moves on to the next asset.
    fn next_price(&self, asset_id: &AssetId, history: &[PricePoint]) -> Result<i64>;
}
