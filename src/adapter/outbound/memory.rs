//! In-memory store implementation for testing.
//!
//! Mirrors the SQLite schema closely enough for the application layer not to
//! tell the difference: composite keys are unique, deleting an account
//! cascades to everything it owns, and inventory rows never hold zero.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    clamp_add, downsample, AssetId, CommandId, CommandSpec, Cooldown, Goods, HistoryInterval,
    Item, ItemId, Order, Position, PricePoint, Record, User, UserField, UserId, UserItem,
    UserPatch, ValidationError,
};
use crate::error::{Error, Result};
use crate::port::{AssetTable, MutableTable, Table, UserTable};

#[derive(Debug, Default)]
struct MemoryDb {
    users: HashMap<UserId, User>,
    items: HashMap<ItemId, Item>,
    commands: HashMap<CommandId, CommandSpec>,
    inventory: BTreeMap<(UserId, ItemId), i64>,
    positions: Vec<Position>,
    cooldowns: HashMap<(UserId, CommandId), Cooldown>,
    prices: HashMap<AssetId, BTreeMap<DateTime<Utc>, i64>>,
}

/// In-memory store for testing purposes.
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    db: Arc<RwLock<MemoryDb>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a database error until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database("simulated write failure".into()));
        }
        Ok(())
    }

    /// Number of stored price points for `asset_id`.
    pub fn price_rows(&self, asset_id: &AssetId) -> usize {
        self.db.read().prices.get(asset_id).map_or(0, BTreeMap::len)
    }
}

fn insert_unique<K: Eq + Hash + Clone + fmt::Display, R: Record<Key = K>>(
    map: &mut HashMap<K, R>,
    row: &R,
) -> Result<R> {
    if map.contains_key(row.key()) {
        return Err(Error::Database(format!("duplicate key {}", row.key())));
    }
    map.insert(row.key().clone(), row.clone());
    Ok(row.clone())
}

fn replace_existing<K: Eq + Hash + Clone + fmt::Display, R: Record<Key = K>>(
    map: &mut HashMap<K, R>,
    row: &R,
) -> Result<R> {
    match map.get_mut(row.key()) {
        Some(slot) => {
            *slot = row.clone();
            Ok(row.clone())
        }
        None => Err(Error::Database(format!("no row for key {}", row.key()))),
    }
}

impl Table<User> for MemoryStore {
    async fn find(&self, key: &UserId) -> Result<Option<User>> {
        Ok(self.db.read().users.get(key).cloned())
    }

    async fn insert(&self, row: &User) -> Result<User> {
        self.check_writable()?;
        insert_unique(&mut self.db.write().users, row)
    }

    async fn delete(&self, key: &UserId) -> Result<bool> {
        self.check_writable()?;
        let mut db = self.db.write();
        let removed = db.users.remove(key).is_some();
        if removed {
            let asset = AssetId::from(key);
            db.inventory.retain(|(user, _), _| user != key);
            db.cooldowns.retain(|(user, _), _| user != key);
            db.positions
                .retain(|p| &p.user_id != key && p.asset_id != asset);
            db.prices.remove(&asset);
        }
        Ok(removed)
    }

    async fn load_all(&self) -> Result<Vec<User>> {
        Ok(self.db.read().users.values().cloned().collect())
    }
}

impl MutableTable<User> for MemoryStore {
    async fn update(&self, row: &User) -> Result<User> {
        self.check_writable()?;
        replace_existing(&mut self.db.write().users, row)
    }
}

impl UserTable for MemoryStore {
    async fn add_clamped(
        &self,
        id: &UserId,
        field: UserField,
        delta: i64,
        touch: bool,
        now: DateTime<Utc>,
    ) -> Result<User> {
        self.check_writable()?;
        let mut db = self.db.write();
        let user = db
            .users
            .entry(id.clone())
            .or_insert_with(|| User::create(id.clone(), &UserPatch::default(), now));
        let value = clamp_add(user.counter(field), delta);
        match field {
            UserField::Balance => user.balance = value,
            UserField::Armor => user.armor = value,
            UserField::ActivityPoints => user.activity_points = value,
        }
        if touch {
            user.last_activity = now;
        }
        Ok(user.clone())
    }

    async fn item(&self, id: &UserId, item_id: &ItemId) -> Result<Option<UserItem>> {
        let db = self.db.read();
        Ok(db
            .inventory
            .get(&(id.clone(), item_id.clone()))
            .map(|&quantity| UserItem {
                user_id: id.clone(),
                item_id: item_id.clone(),
                quantity,
            }))
    }

    async fn items(&self, id: &UserId) -> Result<Vec<UserItem>> {
        let db = self.db.read();
        Ok(db
            .inventory
            .iter()
            .filter(|((user, _), _)| user == id)
            .map(|((user, item), &quantity)| UserItem {
                user_id: user.clone(),
                item_id: item.clone(),
                quantity,
            })
            .collect())
    }

    async fn add_item(
        &self,
        id: &UserId,
        item_id: &ItemId,
        delta: i64,
    ) -> Result<Option<UserItem>> {
        self.check_writable()?;
        let mut db = self.db.write();
        let key = (id.clone(), item_id.clone());
        let quantity = match db.inventory.get(&key).copied() {
            None if delta <= 0 => None,
            None => Some(delta),
            Some(current) => Some(current.saturating_add(delta)).filter(|q| *q > 0),
        };
        match quantity {
            Some(q) => {
                db.inventory.insert(key, q);
            }
            None => {
                db.inventory.remove(&key);
            }
        }
        Ok(quantity.map(|quantity| UserItem {
            user_id: id.clone(),
            item_id: item_id.clone(),
            quantity,
        }))
    }

    async fn item_count(&self, id: &UserId) -> Result<i64> {
        let db = self.db.read();
        Ok(db
            .inventory
            .iter()
            .filter(|((user, _), _)| user == id)
            .map(|(_, q)| *q)
            .sum())
    }

    async fn add_position(&self, position: &Position) -> Result<()> {
        self.check_writable()?;
        let mut db = self.db.write();
        let existing = db.positions.iter_mut().find(|p| {
            p.user_id == position.user_id
                && p.asset_id == position.asset_id
                && p.purchase_time == position.purchase_time
        });
        match existing {
            Some(p) => {
                p.quantity = p
                    .quantity
                    .checked_add(position.quantity)
                    .ok_or(ValidationError::QuantityOverflow)?;
            }
            None => db.positions.push(position.clone()),
        }
        Ok(())
    }

    async fn settle(&self, order: &Order) -> Result<User> {
        self.check_writable()?;
        let mut db = self.db.write();
        let cost = order.total_cost();
        let balance = db
            .users
            .get(&order.buyer)
            .map(|user| user.balance)
            .ok_or_else(|| Error::Database(format!("no account {}", order.buyer)))?;
        if balance < cost {
            return Err(order.insufficient(balance).into());
        }

        match &order.goods {
            Goods::Items { item_id, quantity } => {
                let key = (order.buyer.clone(), item_id.clone());
                let held = db.inventory.get(&key).copied().unwrap_or(0);
                let next = held
                    .checked_add(*quantity)
                    .ok_or(ValidationError::QuantityOverflow)?;
                db.inventory.insert(key, next);
            }
            Goods::Shares { asset_id, .. } => {
                let position = order.position_in(asset_id);
                let existing = db.positions.iter_mut().find(|p| {
                    p.user_id == position.user_id
                        && p.asset_id == position.asset_id
                        && p.purchase_time == position.purchase_time
                });
                match existing {
                    Some(p) => {
                        p.quantity = p
                            .quantity
                            .checked_add(position.quantity)
                            .ok_or(ValidationError::QuantityOverflow)?;
                    }
                    None => db.positions.push(position),
                }
            }
        }

        let user = db
            .users
            .get_mut(&order.buyer)
            .ok_or_else(|| Error::Database(format!("no account {}", order.buyer)))?;
        user.balance -= cost;
        Ok(user.clone())
    }

    async fn cooldown(&self, id: &UserId, command_id: &CommandId) -> Result<Option<Cooldown>> {
        Ok(self
            .db
            .read()
            .cooldowns
            .get(&(id.clone(), command_id.clone()))
            .cloned())
    }

    async fn put_cooldown(&self, cooldown: &Cooldown) -> Result<()> {
        self.check_writable()?;
        self.db.write().cooldowns.insert(
            (cooldown.user_id.clone(), cooldown.command_id.clone()),
            cooldown.clone(),
        );
        Ok(())
    }

    async fn cooldowns(&self) -> Result<Vec<Cooldown>> {
        Ok(self.db.read().cooldowns.values().cloned().collect())
    }

    async fn delete_cooldown(&self, id: &UserId, command_id: &CommandId) -> Result<bool> {
        self.check_writable()?;
        Ok(self
            .db
            .write()
            .cooldowns
            .remove(&(id.clone(), command_id.clone()))
            .is_some())
    }
}

impl Table<Item> for MemoryStore {
    async fn find(&self, key: &ItemId) -> Result<Option<Item>> {
        Ok(self.db.read().items.get(key).cloned())
    }

    async fn insert(&self, row: &Item) -> Result<Item> {
        self.check_writable()?;
        insert_unique(&mut self.db.write().items, row)
    }

    async fn delete(&self, key: &ItemId) -> Result<bool> {
        self.check_writable()?;
        let mut db = self.db.write();
        db.inventory.retain(|(_, item), _| item != key);
        Ok(db.items.remove(key).is_some())
    }

    async fn load_all(&self) -> Result<Vec<Item>> {
        Ok(self.db.read().items.values().cloned().collect())
    }
}

impl MutableTable<Item> for MemoryStore {
    async fn update(&self, row: &Item) -> Result<Item> {
        self.check_writable()?;
        replace_existing(&mut self.db.write().items, row)
    }
}

impl Table<CommandSpec> for MemoryStore {
    async fn find(&self, key: &CommandId) -> Result<Option<CommandSpec>> {
        Ok(self.db.read().commands.get(key).cloned())
    }

    async fn insert(&self, row: &CommandSpec) -> Result<CommandSpec> {
        self.check_writable()?;
        insert_unique(&mut self.db.write().commands, row)
    }

    async fn delete(&self, key: &CommandId) -> Result<bool> {
        self.check_writable()?;
        let mut db = self.db.write();
        db.cooldowns.retain(|(_, command), _| command != key);
        Ok(db.commands.remove(key).is_some())
    }

    async fn load_all(&self) -> Result<Vec<CommandSpec>> {
        Ok(self.db.read().commands.values().cloned().collect())
    }
}

impl MutableTable<CommandSpec> for MemoryStore {
    async fn update(&self, row: &CommandSpec) -> Result<CommandSpec> {
        self.check_writable()?;
        replace_existing(&mut self.db.write().commands, row)
    }
}

fn to_point(asset_id: &AssetId, created_at: DateTime<Utc>, price: i64) -> PricePoint {
    PricePoint {
        asset_id: asset_id.clone(),
        price,
        created_at,
    }
}

impl Table<PricePoint> for MemoryStore {
    async fn find(&self, key: &AssetId) -> Result<Option<PricePoint>> {
        let db = self.db.read();
        Ok(db
            .prices
            .get(key)
            .and_then(|series| series.last_key_value())
            .map(|(at, price)| to_point(key, *at, *price)))
    }

    async fn insert(&self, row: &PricePoint) -> Result<PricePoint> {
        self.check_writable()?;
        let mut db = self.db.write();
        let series = db.prices.entry(row.asset_id.clone()).or_default();
        if series.contains_key(&row.created_at) {
            return Err(Error::Database(format!(
                "duplicate price point {} at {}",
                row.asset_id, row.created_at
            )));
        }
        series.insert(row.created_at, row.price);
        Ok(row.clone())
    }

    async fn delete(&self, key: &AssetId) -> Result<bool> {
        self.check_writable()?;
        Ok(self.db.write().prices.remove(key).is_some())
    }

    async fn load_all(&self) -> Result<Vec<PricePoint>> {
        let db = self.db.read();
        let mut latest: Vec<PricePoint> = db
            .prices
            .iter()
            .filter_map(|(asset, series)| {
                series
                    .last_key_value()
                    .map(|(at, price)| to_point(asset, *at, *price))
            })
            .collect();
        latest.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(latest)
    }
}

impl AssetTable for MemoryStore {
    async fn history(
        &self,
        asset_id: &AssetId,
        interval: HistoryInterval,
        since: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let db = self.db.read();
        let points: Vec<PricePoint> = db
            .prices
            .get(asset_id)
            .map(|series| {
                series
                    .range(since..)
                    .map(|(at, price)| to_point(asset_id, *at, *price))
                    .collect()
            })
            .unwrap_or_default();
        Ok(downsample(points, interval, since))
    }

    async fn total_purchased(&self, asset_id: &AssetId) -> Result<i64> {
        Ok(self
            .db
            .read()
            .positions
            .iter()
            .filter(|p| &p.asset_id == asset_id)
            .map(|p| p.quantity)
            .sum())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.check_writable()?;
        let mut db = self.db.write();
        let mut removed = 0;
        for series in db.prices.values_mut() {
            let Some(latest) = series.last_key_value().map(|(at, _)| *at) else {
                continue;
            };
            let before = series.len();
            series.retain(|at, _| *at >= cutoff || *at == latest);
            removed += before - series.len();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn point(asset: &str, price: i64, at: DateTime<Utc>) -> PricePoint {
        to_point(&AssetId::new(asset), at, price)
    }

    #[tokio::test]
    async fn add_item_never_stores_empty_rows() {
        let store = MemoryStore::new();
        let (u, i) = (UserId::new("u"), ItemId::new("wrench"));

        assert_eq!(store.add_item(&u, &i, -1).await.unwrap(), None);
        assert_eq!(store.add_item(&u, &i, 3).await.unwrap().unwrap().quantity, 3);
        assert_eq!(store.add_item(&u, &i, -3).await.unwrap(), None);
        assert!(store.items(&u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keys_must_be_unique_and_present() {
        let store = MemoryStore::new();
        let user = User::create(UserId::new("u"), &UserPatch::default(), Utc::now());

        Table::<User>::insert(&store, &user).await.unwrap();
        let err = Table::<User>::insert(&store, &user).await.unwrap_err();
        assert_eq!(err.to_string(), "database error: duplicate key u");

        let ghost = User::create(UserId::new("ghost"), &UserPatch::default(), Utc::now());
        let err = MutableTable::<User>::update(&store, &ghost).await.unwrap_err();
        assert_eq!(err.to_string(), "database error: no row for key ghost");
    }

    #[tokio::test]
    async fn latest_price_is_max_timestamp() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        Table::<PricePoint>::insert(&store, &point("a", 2, t0 + Duration::seconds(5)))
            .await
            .unwrap();
        Table::<PricePoint>::insert(&store, &point("a", 1, t0)).await.unwrap();

        let latest = Table::<PricePoint>::find(&store, &AssetId::new("a"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.price, 2);
    }

    #[tokio::test]
    async fn prune_keeps_latest_point_of_stale_series() {
        let store = MemoryStore::new();
        let old = Utc::now() - Duration::days(400);
        for i in 0..3 {
            Table::<PricePoint>::insert(&store, &point("a", i, old + Duration::minutes(i)))
                .await
                .unwrap();
        }

        let removed = store.prune_before(Utc::now()).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.price_rows(&AssetId::new("a")), 1);
    }

    #[tokio::test]
    async fn deleting_account_cascades() {
        let store = MemoryStore::new();
        let u = UserId::new("u");
        store
            .add_clamped(&u, UserField::Balance, 5, false, Utc::now())
            .await
            .unwrap();
        store.add_item(&u, &ItemId::new("wrench"), 1).await.unwrap();
        Table::<PricePoint>::insert(&store, &point("u", 10, Utc::now()))
            .await
            .unwrap();

        assert!(Table::<User>::delete(&store, &u).await.unwrap());
        assert_eq!(store.item_count(&u).await.unwrap(), 0);
        assert_eq!(store.price_rows(&AssetId::new("u")), 0);
    }
}
