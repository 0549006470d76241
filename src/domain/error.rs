//! Domain validation and permission errors.
//!
//! These are surfaced synchronously to the caller so the user gets direct
//! feedback; none of them indicate a storage problem.

use thiserror::Error;

use super::id::{AssetId, CommandId, ItemId};

/// A request that violates a domain rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Quantities and amounts must be at least one.
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount { amount: i64 },

    #[error("item '{item_id}' does not exist")]
    UnknownItem { item_id: ItemId },

    #[error("asset '{asset_id}' does not exist")]
    UnknownAsset { asset_id: AssetId },

    #[error("command '{command_id}' does not exist")]
    UnknownCommand { command_id: CommandId },

    /// Users cannot trade their own asset.
    #[error("cannot target yourself")]
    SelfTarget,

    #[error("inventory is full ({capacity} items)")]
    InventoryFull { capacity: i64 },

    #[error("balance {balance} cannot cover a unit price of {unit_price}")]
    InsufficientFunds { balance: i64, unit_price: i64 },

    /// Shares of an asset priced at zero cannot be bought.
    #[error("asset '{asset_id}' has no price yet")]
    Unpriced { asset_id: AssetId },

    #[error("holding would exceed the maximum quantity")]
    QuantityOverflow,

    #[error("invalid interval '{value}', expected minute, hour, day or month")]
    InvalidInterval { value: String },
}

/// An admin-only action was attempted by a regular user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("command '{command_id}' requires administrator permission")]
pub struct PermissionError {
    pub command_id: CommandId,
}
