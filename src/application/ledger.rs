//! Account balances, inventory, positions and cooldown rows.
//!
//! Every counter update is a single add-and-clamp statement in storage run
//! under the account's key lock, so concurrent deltas never lose each other
//! and the cached row always matches the last committed one.

use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::application::cache::CacheAsideStore;
use crate::application::catalog::Catalog;
use crate::domain::{
    AccountSnapshot, AssetId, CommandId, Cooldown, Goods, ItemId, Order, Position, User,
    UserField, UserId, UserItem, UserPatch, ValidationError,
};
use crate::error::{LogPersistence, Result};
use crate::port::{Clock, Storage, UserTable};

pub struct UserLedger<S: Storage> {
    users: CacheAsideStore<User, S>,
    catalog: Arc<Catalog<S>>,
    clock: Arc<dyn Clock>,
}

impl<S: Storage> UserLedger<S> {
    pub fn new(storage: S, catalog: Arc<Catalog<S>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: CacheAsideStore::new(storage, clock.clone()),
            catalog,
            clock,
        }
    }

    fn storage(&self) -> &S {
        self.users.table()
    }

    pub async fn account(&self, id: &UserId) -> Result<Option<User>> {
        self.users.get(id).await.log_persistence("load account")
    }

    /// Profile view; an unknown user reads as all zeros.
    pub async fn snapshot(&self, id: &UserId) -> Result<AccountSnapshot> {
        Ok(self
            .account(id)
            .await?
            .map(|user| user.snapshot())
            .unwrap_or_default())
    }

    pub async fn balance(&self, id: &UserId) -> Result<i64> {
        Ok(self.account(id).await?.map_or(0, |user| user.balance))
    }

    /// Create the account with zeroed counters if it does not exist yet.
    pub async fn ensure_account(&self, id: &UserId) -> Result<User> {
        if let Some(user) = self.account(id).await? {
            return Ok(user);
        }
        debug!(user = %id, "Creating account");
        self.users
            .set(id, &UserPatch::default())
            .await
            .log_persistence("create account")
    }

    async fn add_counter(
        &self,
        id: &UserId,
        field: UserField,
        delta: i64,
        touch: bool,
    ) -> Result<User> {
        let now = self.clock.now();
        let owned = id.clone();
        self.users
            .write_through(id, move |storage| async move {
                storage.add_clamped(&owned, field, delta, touch, now).await
            })
            .await
            .log_persistence("update account")
    }

    /// Add `delta` to the balance, flooring at zero.
    pub async fn add_balance(&self, id: &UserId, delta: i64) -> Result<User> {
        self.add_counter(id, UserField::Balance, delta, false).await
    }

    pub async fn add_armor(&self, id: &UserId, delta: i64) -> Result<User> {
        self.add_counter(id, UserField::Armor, delta, false).await
    }

    /// Add activity points and stamp `last_activity`.
    pub async fn add_activity_points(&self, id: &UserId, delta: i64) -> Result<User> {
        self.add_counter(id, UserField::ActivityPoints, delta, true).await
    }

    /// Overwrite the balance. Negative values are stored as zero.
    pub async fn set_balance(&self, id: &UserId, value: i64) -> Result<User> {
        let patch = UserPatch {
            balance: Some(value.max(0)),
            ..UserPatch::default()
        };
        self.users
            .set(id, &patch)
            .await
            .log_persistence("set balance")
    }

    /// Adjust the held quantity of `item_id` by `delta`.
    ///
    /// Adding an item that is not in the catalog is rejected; removing one
    /// is allowed so stale rows can still be cleared.
    pub async fn add_item(
        &self,
        id: &UserId,
        item_id: &ItemId,
        delta: i64,
    ) -> Result<Option<UserItem>> {
        if delta > 0 && self.catalog.item(item_id).await?.is_none() {
            return Err(ValidationError::UnknownItem {
                item_id: item_id.clone(),
            }
            .into());
        }
        if delta > 0 {
            self.ensure_account(id).await?;
        }
        let _guard = self.users.lock(id).await;
        self.storage()
            .add_item(id, item_id, delta)
            .await
            .log_persistence("update inventory")
    }

    pub async fn item(&self, id: &UserId, item_id: &ItemId) -> Result<Option<UserItem>> {
        self.storage()
            .item(id, item_id)
            .await
            .log_persistence("load inventory")
    }

    pub async fn items(&self, id: &UserId) -> Result<Vec<UserItem>> {
        self.storage().items(id).await.log_persistence("load inventory")
    }

    /// Total quantity held across every item.
    pub async fn item_count(&self, id: &UserId) -> Result<i64> {
        self.storage()
            .item_count(id)
            .await
            .log_persistence("count inventory")
    }

    /// Record a purchase of `quantity` shares of `asset_id` at `price` each.
    pub async fn add_position(
        &self,
        id: &UserId,
        asset_id: &AssetId,
        quantity: i64,
        price: i64,
    ) -> Result<Position> {
        if quantity <= 0 {
            return Err(ValidationError::NonPositiveAmount { amount: quantity }.into());
        }
        self.ensure_account(id).await?;
        self.ensure_account(&asset_id.owner()).await?;
        let position = Position {
            user_id: id.clone(),
            asset_id: asset_id.clone(),
            purchase_time: self.clock.now(),
            quantity,
            purchase_price: price.max(0),
        };
        self.storage()
            .add_position(&position)
            .await
            .log_persistence("record position")?;
        Ok(position)
    }

    /// Charge `buyer` for `goods` at `unit_price` each and hand them over,
    /// both in one storage transaction.
    ///
    /// The balance check happens inside that transaction, so a debit that
    /// lands between the caller's own check and this call still rejects
    /// the order with `InsufficientFunds`.
    pub async fn settle(&self, buyer: &UserId, goods: Goods, unit_price: i64) -> Result<User> {
        let quantity = goods.quantity();
        if quantity <= 0 {
            return Err(ValidationError::NonPositiveAmount { amount: quantity }.into());
        }
        match &goods {
            Goods::Items { item_id, .. } => {
                if self.catalog.item(item_id).await?.is_none() {
                    return Err(ValidationError::UnknownItem {
                        item_id: item_id.clone(),
                    }
                    .into());
                }
            }
            Goods::Shares { asset_id, .. } => {
                self.ensure_account(&asset_id.owner()).await?;
            }
        }
        self.ensure_account(buyer).await?;
        let order = Order {
            buyer: buyer.clone(),
            goods,
            unit_price,
            placed_at: self.clock.now(),
        };
        self.users
            .write_through(buyer, move |storage| async move { storage.settle(&order).await })
            .await
            .log_persistence("settle purchase")
    }

    /// Start (or restart) the cooldown of `command_id` for `id` now.
    pub async fn create_cooldown(
        &self,
        id: &UserId,
        command_id: &CommandId,
    ) -> Result<Cooldown> {
        self.ensure_account(id).await?;
        let cooldown = Cooldown {
            user_id: id.clone(),
            command_id: command_id.clone(),
            start_time: self.clock.now(),
        };
        self.storage()
            .put_cooldown(&cooldown)
            .await
            .log_persistence("start cooldown")?;
        Ok(cooldown)
    }

    /// Time left on the cooldown; zero or negative when the command is free.
    pub async fn remaining_cooldown(
        &self,
        id: &UserId,
        command_id: &CommandId,
    ) -> Result<Duration> {
        let Some(command) = self.catalog.command(command_id).await? else {
            return Ok(Duration::zero());
        };
        let row = self
            .storage()
            .cooldown(id, command_id)
            .await
            .log_persistence("load cooldown")?;
        Ok(row.map_or_else(Duration::zero, |cooldown| {
            cooldown.remaining(command.cooldown_ms, self.clock.now())
        }))
    }

    /// Delete cooldown rows that no longer block anything.
    pub async fn prune_expired_cooldowns(&self) -> Result<usize> {
        let rows = self.storage().cooldowns().await?;
        let now = self.clock.now();
        let mut removed = 0;
        for row in rows {
            let expired = match self.catalog.command(&row.command_id).await? {
                Some(command) => row.remaining(command.cooldown_ms, now) <= Duration::zero(),
                None => true,
            };
            if expired && self.storage().delete_cooldown(&row.user_id, &row.command_id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Load every account into the cache.
    pub async fn refresh_cache(&self) -> Result<usize> {
        self.users.refresh_cache().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryStore;
    use crate::domain::{CommandPatch, ItemPatch};
    use crate::error::Error;
    use crate::testkit::ManualClock;

    struct Fixture {
        ledger: Arc<UserLedger<MemoryStore>>,
        catalog: Arc<Catalog<MemoryStore>>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::default());
        let catalog = Arc::new(Catalog::new(store.clone(), clock.clone()));
        let ledger = Arc::new(UserLedger::new(store, catalog.clone(), clock.clone()));
        Fixture {
            ledger,
            catalog,
            clock,
        }
    }

    async fn with_item(f: &Fixture, id: &str) -> ItemId {
        let id = ItemId::new(id);
        f.catalog
            .register_item(
                &id,
                &ItemPatch {
                    price: Some(10),
                    ..ItemPatch::default()
                },
            )
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn balance_scenario_floors_at_zero() {
        let f = fixture();
        let u = UserId::new("u");

        assert_eq!(f.ledger.balance(&u).await.unwrap(), 0);
        f.ledger.add_balance(&u, 10_000).await.unwrap();
        assert_eq!(f.ledger.balance(&u).await.unwrap(), 10_000);
        f.ledger.add_balance(&u, -15_000).await.unwrap();
        assert_eq!(f.ledger.balance(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn arbitrary_deltas_never_go_negative() {
        let f = fixture();
        let u = UserId::new("u");
        let deltas = [5, -7, 3, i64::MIN, 12, -1, -100, 40, i64::MAX, -3];

        for delta in deltas {
            let user = f.ledger.add_balance(&u, delta).await.unwrap();
            assert!(user.balance >= 0);
            let user = f.ledger.add_armor(&u, delta).await.unwrap();
            assert!(user.armor >= 0);
            let user = f.ledger.add_activity_points(&u, delta).await.unwrap();
            assert!(user.activity_points >= 0);
        }
    }

    #[tokio::test]
    async fn concurrent_deltas_are_not_lost() {
        let f = fixture();
        let u = UserId::new("u");

        let mut handles = Vec::new();
        for _ in 0..50 {
            let (ledger, u) = (f.ledger.clone(), u.clone());
            handles.push(tokio::spawn(async move { ledger.add_balance(&u, 2).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(f.ledger.balance(&u).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn activity_points_stamp_last_activity() {
        let f = fixture();
        let u = UserId::new("u");
        f.ledger.ensure_account(&u).await.unwrap();

        f.clock.advance(Duration::minutes(5));
        let user = f.ledger.add_activity_points(&u, 1).await.unwrap();
        assert_eq!(user.last_activity, f.clock.now());
    }

    #[tokio::test]
    async fn item_rows_disappear_when_emptied() {
        let f = fixture();
        let u = UserId::new("u");
        let wrench = with_item(&f, "wrench").await;

        assert_eq!(f.ledger.add_item(&u, &wrench, 3).await.unwrap().unwrap().quantity, 3);
        assert_eq!(f.ledger.item_count(&u).await.unwrap(), 3);

        assert_eq!(f.ledger.add_item(&u, &wrench, -3).await.unwrap(), None);
        assert_eq!(f.ledger.item(&u, &wrench).await.unwrap(), None);
        assert_eq!(f.ledger.item_count(&u).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn removing_from_absent_row_is_a_no_op() {
        let f = fixture();
        let u = UserId::new("u");
        let wrench = with_item(&f, "wrench").await;

        assert_eq!(f.ledger.add_item(&u, &wrench, -2).await.unwrap(), None);
        assert!(f.ledger.items(&u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_items_are_rejected() {
        let f = fixture();
        let err = f
            .ledger
            .add_item(&UserId::new("u"), &ItemId::new("nope"), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::UnknownItem { .. })
        ));
    }

    #[tokio::test]
    async fn set_balance_clamps() {
        let f = fixture();
        let u = UserId::new("u");
        assert_eq!(f.ledger.set_balance(&u, -50).await.unwrap().balance, 0);
        assert_eq!(f.ledger.set_balance(&u, 50).await.unwrap().balance, 50);
    }

    #[tokio::test]
    async fn cooldown_runs_out() {
        let f = fixture();
        let (u, work) = (UserId::new("u"), CommandId::new("work"));
        f.catalog
            .register_command(
                &work,
                &CommandPatch {
                    cooldown_ms: Some(60_000),
                    ..CommandPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(f.ledger.remaining_cooldown(&u, &work).await.unwrap(), Duration::zero());
        f.ledger.create_cooldown(&u, &work).await.unwrap();
        assert!(f.ledger.remaining_cooldown(&u, &work).await.unwrap() > Duration::zero());

        f.clock.advance(Duration::seconds(61));
        assert!(f.ledger.remaining_cooldown(&u, &work).await.unwrap() <= Duration::zero());
        assert_eq!(f.ledger.prune_expired_cooldowns().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn settle_rejects_orders_the_balance_cannot_cover() {
        let f = fixture();
        let u = UserId::new("u");
        let wrench = with_item(&f, "wrench").await;
        f.ledger.add_balance(&u, 25).await.unwrap();

        let goods = Goods::Items {
            item_id: wrench.clone(),
            quantity: 3,
        };
        let err = f.ledger.settle(&u, goods, 10).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InsufficientFunds { balance: 25, .. })
        ));
        assert_eq!(f.ledger.item_count(&u).await.unwrap(), 0);

        let goods = Goods::Items {
            item_id: wrench,
            quantity: 2,
        };
        assert_eq!(f.ledger.settle(&u, goods, 10).await.unwrap().balance, 5);
        assert_eq!(f.ledger.item_count(&u).await.unwrap(), 2);
        assert_eq!(f.ledger.balance(&u).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn position_overflow_is_rejected() {
        let f = fixture();
        let (buyer, asset) = (UserId::new("buyer"), AssetId::new("seller"));

        f.ledger.add_position(&buyer, &asset, i64::MAX, 0).await.unwrap();
        let err = f.ledger.add_position(&buyer, &asset, 1, 0).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::QuantityOverflow)
        ));
    }

    #[tokio::test]
    async fn positions_create_both_accounts() {
        let f = fixture();
        let (buyer, asset) = (UserId::new("buyer"), AssetId::new("seller"));

        f.ledger.add_position(&buyer, &asset, 2, 40).await.unwrap();
        assert!(f.ledger.account(&buyer).await.unwrap().is_some());
        assert!(f.ledger.account(&asset.owner()).await.unwrap().is_some());
    }
}
