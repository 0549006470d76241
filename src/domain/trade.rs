//! Purchase arithmetic shared by item and share purchases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Position;
use super::error::ValidationError;
use super::id::{AssetId, ItemId, UserId};

/// How many units a buyer asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    Exact(i64),
    /// As many as the buyer can afford (and hold).
    All,
}

impl Quantity {
    /// Requested units, or `None` for [`Quantity::All`].
    ///
    /// # Errors
    /// Returns [`ValidationError::NonPositiveAmount`] for an exact request
    /// below one.
    pub fn requested(self) -> Result<Option<i64>, ValidationError> {
        match self {
            Self::Exact(n) if n <= 0 => Err(ValidationError::NonPositiveAmount { amount: n }),
            Self::Exact(n) => Ok(Some(n)),
            Self::All => Ok(None),
        }
    }
}

/// Outcome of a completed purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub quantity: i64,
    pub total_cost: i64,
}

/// What a purchase hands over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goods {
    Items { item_id: ItemId, quantity: i64 },
    Shares { asset_id: AssetId, quantity: i64 },
}

impl Goods {
    #[must_use]
    pub fn quantity(&self) -> i64 {
        match self {
            Self::Items { quantity, .. } | Self::Shares { quantity, .. } => *quantity,
        }
    }
}

/// A purchase to settle: the debit and the grant commit together or not at
/// all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub buyer: UserId,
    pub goods: Goods,
    pub unit_price: i64,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn total_cost(&self) -> i64 {
        self.goods.quantity().saturating_mul(self.unit_price.max(0))
    }

    /// The position this order opens in `asset_id`.
    #[must_use]
    pub fn position_in(&self, asset_id: &AssetId) -> Position {
        Position {
            user_id: self.buyer.clone(),
            asset_id: asset_id.clone(),
            purchase_time: self.placed_at,
            quantity: self.goods.quantity(),
            purchase_price: self.unit_price.max(0),
        }
    }

    /// The rejection for a buyer holding only `balance`.
    #[must_use]
    pub fn insufficient(&self, balance: i64) -> ValidationError {
        ValidationError::InsufficientFunds {
            balance,
            unit_price: self.unit_price,
        }
    }
}

/// Whole units of `unit_price` that `balance` covers. Free goods are
/// unbounded.
#[must_use]
pub fn affordable(balance: i64, unit_price: i64) -> i64 {
    if unit_price <= 0 {
        return i64::MAX;
    }
    balance.max(0) / unit_price
}

/// Units actually bought: the request capped by what the buyer can afford
/// and, when given, by free space.
#[must_use]
pub fn units_to_buy(requested: Option<i64>, affordable: i64, free_space: Option<i64>) -> i64 {
    let mut units = requested.map_or(affordable, |n| n.min(affordable));
    if let Some(free) = free_space {
        units = units.min(free);
    }
    units.max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_quantity_must_be_positive() {
        assert_eq!(Quantity::Exact(3).requested(), Ok(Some(3)));
        assert_eq!(Quantity::All.requested(), Ok(None));
        assert_eq!(
            Quantity::Exact(0).requested(),
            Err(ValidationError::NonPositiveAmount { amount: 0 })
        );
    }

    #[test]
    fn buys_as_many_as_affordable_and_free() {
        assert_eq!(affordable(999, 100), 9);
        assert_eq!(affordable(-5, 100), 0);
        assert_eq!(units_to_buy(Some(20), 9, Some(5)), 5);
        assert_eq!(units_to_buy(Some(2), 9, Some(5)), 2);
        assert_eq!(units_to_buy(None, 9, None), 9);
        assert_eq!(units_to_buy(Some(4), 0, Some(5)), 0);
    }

    #[test]
    fn share_orders_open_a_position() {
        let order = Order {
            buyer: UserId::new("u"),
            goods: Goods::Shares {
                asset_id: AssetId::new("seller"),
                quantity: 4,
            },
            unit_price: 25,
            placed_at: DateTime::<Utc>::default(),
        };
        assert_eq!(order.total_cost(), 100);
        let position = order.position_in(&AssetId::new("seller"));
        assert_eq!((position.quantity, position.purchase_price), (4, 25));
        assert_eq!(
            order.insufficient(99),
            ValidationError::InsufficientFunds {
                balance: 99,
                unit_price: 25
            }
        );
    }
}
