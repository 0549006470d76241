//! Persistence ports for the economy tables.
//!
//! [`Table`] is the backing-store half of the cache-aside contract. Its
//! `find` and `load_all` carry the latest-selection strategy: a keyed
//! entity returns the row under its primary key, an append-only series
//! returns the row with the greatest timestamp for the key.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::domain::{
    AssetId, CommandId, CommandSpec, Cooldown, HistoryInterval, Item, ItemId, Order, Position,
    PricePoint, Record, User, UserField, UserId, UserItem,
};
use crate::error::Result;

/// Durable storage for one record type.
pub trait Table<R: Record>: Send + Sync {
    /// Current row for `key`, if any.
    fn find(&self, key: &R::Key) -> impl Future<Output = Result<Option<R>>> + Send;

    /// Insert a new row and return it as stored.
    fn insert(&self, row: &R) -> impl Future<Output = Result<R>> + Send;

    /// Delete every row under `key`. Returns whether anything was deleted.
    fn delete(&self, key: &R::Key) -> impl Future<Output = Result<bool>> + Send;

    /// Current row of every key.
    fn load_all(&self) -> impl Future<Output = Result<Vec<R>>> + Send;
}

/// Storage whose rows may be rewritten in place.
pub trait MutableTable<R: Record>: Table<R> {
    /// Replace the stored row with `row` and return it as stored.
    fn update(&self, row: &R) -> impl Future<Output = Result<R>> + Send;
}

/// Account storage with the atomic operations the ledger relies on.
pub trait UserTable: MutableTable<User> {
    /// Atomically set `field = max(field + delta, 0)`, creating the account
    /// (all counters zero, `last_activity = now`) when it does not exist.
    ///
    /// When `touch` is set `last_activity` is also moved to `now`.
    fn add_clamped(
        &self,
        id: &UserId,
        field: UserField,
        delta: i64,
        touch: bool,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<User>> + Send;

    fn item(
        &self,
        id: &UserId,
        item_id: &ItemId,
    ) -> impl Future<Output = Result<Option<UserItem>>> + Send;

    fn items(&self, id: &UserId) -> impl Future<Output = Result<Vec<UserItem>>> + Send;

    /// Atomically adjust an inventory row by `delta`.
    ///
    /// A missing row is inserted only for a positive delta; a row whose
    /// quantity drops to zero or below is deleted. Returns the row left
    /// behind, if any.
    fn add_item(
        &self,
        id: &UserId,
        item_id: &ItemId,
        delta: i64,
    ) -> impl Future<Output = Result<Option<UserItem>>> + Send;

    /// Sum of quantities across every inventory row of `id`.
    fn item_count(&self, id: &UserId) -> impl Future<Output = Result<i64>> + Send;

    /// Add `position` to the buyer's holding for the same purchase time.
    ///
    /// Fails with [`ValidationError::QuantityOverflow`](crate::domain::ValidationError)
    /// instead of wrapping.
    fn add_position(&self, position: &Position) -> impl Future<Output = Result<()>> + Send;

    /// Debit the order's total cost and hand over its goods atomically.
    ///
    /// Nothing is written when the stored balance no longer covers the
    /// cost (`InsufficientFunds`) or the grant would overflow. Returns the
    /// buyer's account after the debit.
    fn settle(&self, order: &Order) -> impl Future<Output = Result<User>> + Send;

    fn cooldown(
        &self,
        id: &UserId,
        command_id: &CommandId,
    ) -> impl Future<Output = Result<Option<Cooldown>>> + Send;

    /// Insert or restart the cooldown for (user, command).
    fn put_cooldown(&self, cooldown: &Cooldown) -> impl Future<Output = Result<()>> + Send;

    fn cooldowns(&self) -> impl Future<Output = Result<Vec<Cooldown>>> + Send;

    fn delete_cooldown(
        &self,
        id: &UserId,
        command_id: &CommandId,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Append-only price history storage.
pub trait AssetTable: Table<PricePoint> {
    /// One point per calendar bucket of `interval` at or after `since`: the
    /// latest point in that bucket. Ordered most recent first.
    fn history(
        &self,
        asset_id: &AssetId,
        interval: HistoryInterval,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<PricePoint>>> + Send;

    /// Sum of position quantities held in `asset_id`.
    fn total_purchased(&self, asset_id: &AssetId) -> impl Future<Output = Result<i64>> + Send;

    /// Delete points older than `cutoff`, keeping each asset's latest point.
    fn prune_before(&self, cutoff: DateTime<Utc>) -> impl Future<Output = Result<usize>> + Send;
}

/// Everything one tenant's economy needs from its storage backend.
pub trait Storage:
    UserTable + AssetTable + MutableTable<Item> + MutableTable<CommandSpec> + Clone + 'static
{
}

impl<S> Storage for S where
    S: UserTable + AssetTable + MutableTable<Item> + MutableTable<CommandSpec> + Clone + 'static
{
}
