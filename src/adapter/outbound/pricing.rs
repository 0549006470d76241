//! Default pricing strategy for the binary.

use rand::Rng;

use crate::domain::{AssetId, PricePoint};
use crate::error::{Error, Result};
use crate::port::PricingStrategy;

/// Moves each price by a uniform random step of at most `max_step_percent`
/// of its latest value.
///
/// Prices never fall below one unit, so an asset can always recover.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    max_step: f64,
    initial_price: i64,
}

impl RandomWalk {
    /// # Errors
    /// Returns [`Error::Pricing`] when the step is negative or not finite.
    pub fn new(max_step_percent: f64, initial_price: i64) -> Result<Self> {
        if !max_step_percent.is_finite() || max_step_percent < 0.0 {
            return Err(Error::Pricing(format!(
                "max step must be a non-negative percentage, got {max_step_percent}"
            )));
        }
        Ok(Self {
            max_step: max_step_percent / 100.0,
            initial_price: initial_price.max(1),
        })
    }

    fn step(&self, latest: i64, unit: f64) -> i64 {
        let delta = (latest as f64 * self.max_step * unit).round() as i64;
        latest.saturating_add(delta).max(1)
    }
}

impl PricingStrategy for RandomWalk {
    fn name(&self) -> &'static str {
        "random-walk"
    }

    fn next_price(&self, _asset_id: &AssetId, history: &[PricePoint]) -> Result<i64> {
        let Some(latest) = history.first() else {
            return Ok(self.initial_price);
        };
        let unit = rand::thread_rng().gen_range(-1.0..=1.0);
        Ok(self.step(latest.price, unit))
    }
}
