//! Accounts, inventory, positions and cooldowns.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::SqliteConnection;

use super::database::model::{
    encode_time, CooldownRow, PositionRow, TotalRow, UserItemRow, UserRow,
};
use super::database::schema::{cooldowns, positions, user_items, users};
use super::store::{db_err, SqliteStore};
use crate::domain::{
    CommandId, Cooldown, Goods, ItemId, Order, Position, User, UserField, UserId, UserItem,
    ValidationError,
};
use crate::error::{Error, Result};
use crate::port::{MutableTable, Table, UserTable};

impl Table<User> for SqliteStore {
    async fn find(&self, key: &UserId) -> Result<Option<User>> {
        let mut conn = self.conn()?;
        let row: Option<UserRow> = users::table
            .find(key.as_str())
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        row.map(User::try_from).transpose()
    }

    async fn insert(&self, row: &User) -> Result<User> {
        let mut conn = self.conn()?;
        diesel::insert_into(users::table)
            .values(UserRow::from(row))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(row.clone())
    }

    async fn delete(&self, key: &UserId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(users::table.find(key.as_str()))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(deleted > 0)
    }

    async fn load_all(&self) -> Result<Vec<User>> {
        let mut conn = self.conn()?;
        let rows: Vec<UserRow> = users::table
            .select(UserRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        rows.into_iter().map(User::try_from).collect()
    }
}

impl MutableTable<User> for SqliteStore {
    async fn update(&self, row: &User) -> Result<User> {
        let mut conn = self.conn()?;
        let updated = diesel::update(users::table.find(row.id.as_str()))
            .set(UserRow::from(row))
            .execute(&mut conn)
            .map_err(db_err)?;
        if updated == 0 {
            return Err(Error::Database(format!("no account {}", row.id)));
        }
        Ok(row.clone())
    }
}

impl UserTable for SqliteStore {
    async fn add_clamped(
        &self,
        id: &UserId,
        field: UserField,
        delta: i64,
        touch: bool,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let column = field.column();
        let touch_clause = if touch {
            ", last_activity = excluded.last_activity"
        } else {
            ""
        };
        let upsert = format!(
            "INSERT INTO users (id, {column}, last_activity) VALUES (?1, MAX(?2, 0), ?3) \
             ON CONFLICT(id) DO UPDATE SET {column} = MAX(users.{column} + ?2, 0){touch_clause}"
        );

        let mut conn = self.conn()?;
        let row: UserRow = conn
            .immediate_transaction(|conn| {
                diesel::sql_query(&upsert)
                    .bind::<Text, _>(id.as_str())
                    .bind::<BigInt, _>(delta)
                    .bind::<Text, _>(encode_time(&now))
                    .execute(conn)?;
                users::table
                    .find(id.as_str())
                    .select(UserRow::as_select())
                    .first(conn)
            })
            .map_err(db_err)?;
        User::try_from(row)
    }

    async fn item(&self, id: &UserId, item_id: &ItemId) -> Result<Option<UserItem>> {
        let mut conn = self.conn()?;
        let row: Option<UserItemRow> = user_items::table
            .find((id.as_str(), item_id.as_str()))
            .select(UserItemRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        Ok(row.map(UserItem::from))
    }

    async fn items(&self, id: &UserId) -> Result<Vec<UserItem>> {
        let mut conn = self.conn()?;
        let rows: Vec<UserItemRow> = user_items::table
            .filter(user_items::user_id.eq(id.as_str()))
            .order(user_items::item_id.asc())
            .select(UserItemRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        Ok(rows.into_iter().map(UserItem::from).collect())
    }

    async fn add_item(
        &self,
        id: &UserId,
        item_id: &ItemId,
        delta: i64,
    ) -> Result<Option<UserItem>> {
        let mut conn = self.conn()?;
        let quantity = conn
            .immediate_transaction(|conn| adjust_item(conn, id, item_id, delta))
            .map_err(db_err)?;

        Ok(quantity.map(|quantity| UserItem {
            user_id: id.clone(),
            item_id: item_id.clone(),
            quantity,
        }))
    }

    async fn item_count(&self, id: &UserId) -> Result<i64> {
        let mut conn = self.conn()?;
        let row: TotalRow = diesel::sql_query(
            "SELECT CAST(COALESCE(SUM(quantity), 0) AS BIGINT) AS total FROM user_items WHERE user_id = ?1",
        )
        .bind::<Text, _>(id.as_str())
        .get_result(&mut conn)
        .map_err(db_err)?;
        Ok(row.total)
    }

    async fn add_position(&self, position: &Position) -> Result<()> {
        let row = PositionRow::from(position);
        let mut conn = self.conn()?;
        conn.immediate_transaction(|conn| grow_position(conn, &row))
            .map_err(db_err)?
            .ok_or(ValidationError::QuantityOverflow)?;
        Ok(())
    }

    async fn settle(&self, order: &Order) -> Result<User> {
        let cost = order.total_cost();
        let buyer = order.buyer.as_str();
        let mut conn = self.conn()?;
        let outcome = conn
            .immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                let balance: i64 = users::table
                    .find(buyer)
                    .select(users::balance)
                    .first(conn)?;
                if balance < cost {
                    return Ok(Err(order.insufficient(balance)));
                }

                let granted = match &order.goods {
                    Goods::Items { item_id, quantity } => {
                        let held: Option<i64> = user_items::table
                            .find((buyer, item_id.as_str()))
                            .select(user_items::quantity)
                            .first(conn)
                            .optional()?;
                        if held.unwrap_or(0).checked_add(*quantity).is_none() {
                            return Ok(Err(ValidationError::QuantityOverflow));
                        }
                        adjust_item(conn, &order.buyer, item_id, *quantity)?;
                        true
                    }
                    Goods::Shares { asset_id, .. } => {
                        let row = PositionRow::from(&order.position_in(asset_id));
                        grow_position(conn, &row)?.is_some()
                    }
                };
                if !granted {
                    return Ok(Err(ValidationError::QuantityOverflow));
                }

                diesel::update(users::table.find(buyer))
                    .set(users::balance.eq(users::balance - cost))
                    .execute(conn)?;
                users::table
                    .find(buyer)
                    .select(UserRow::as_select())
                    .first(conn)
                    .map(Ok)
            })
            .map_err(db_err)?;
        User::try_from(outcome?)
    }

    async fn cooldown(&self, id: &UserId, command_id: &CommandId) -> Result<Option<Cooldown>> {
        let mut conn = self.conn()?;
        let row: Option<CooldownRow> = cooldowns::table
            .find((id.as_str(), command_id.as_str()))
            .select(CooldownRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        row.map(Cooldown::try_from).transpose()
    }

    async fn put_cooldown(&self, cooldown: &Cooldown) -> Result<()> {
        let mut conn = self.conn()?;
        diesel::replace_into(cooldowns::table)
            .values(CooldownRow::from(cooldown))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(())
    }

    async fn cooldowns(&self) -> Result<Vec<Cooldown>> {
        let mut conn = self.conn()?;
        let rows: Vec<CooldownRow> = cooldowns::table
            .select(CooldownRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        rows.into_iter().map(Cooldown::try_from).collect()
    }

    async fn delete_cooldown(&self, id: &UserId, command_id: &CommandId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(cooldowns::table.find((id.as_str(), command_id.as_str())))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(deleted > 0)
    }
}

/// Adjust one inventory row by `delta`, deleting it at zero or below.
/// Returns the quantity left.
fn adjust_item(
    conn: &mut SqliteConnection,
    id: &UserId,
    item_id: &ItemId,
    delta: i64,
) -> QueryResult<Option<i64>> {
    let key = (id.as_str(), item_id.as_str());
    let current: Option<i64> = user_items::table
        .find(key)
        .select(user_items::quantity)
        .first(conn)
        .optional()?;
    match current {
        None if delta <= 0 => Ok(None),
        None => {
            diesel::insert_into(user_items::table)
                .values(UserItemRow {
                    user_id: id.to_string(),
                    item_id: item_id.to_string(),
                    quantity: delta,
                })
                .execute(conn)?;
            Ok(Some(delta))
        }
        Some(current) => {
            let next = current.saturating_add(delta);
            if next <= 0 {
                diesel::delete(user_items::table.find(key)).execute(conn)?;
                Ok(None)
            } else {
                diesel::update(user_items::table.find(key))
                    .set(user_items::quantity.eq(next))
                    .execute(conn)?;
                Ok(Some(next))
            }
        }
    }
}

/// Add `row` to the holding under its key. `None` when the sum would
/// overflow, in which case nothing is written.
fn grow_position(conn: &mut SqliteConnection, row: &PositionRow) -> QueryResult<Option<i64>> {
    let key = (
        row.user_id.as_str(),
        row.asset_id.as_str(),
        row.purchase_time.as_str(),
    );
    let current: Option<i64> = positions::table
        .find(key)
        .select(positions::quantity)
        .first(conn)
        .optional()?;
    let Some(next) = current.unwrap_or(0).checked_add(row.quantity) else {
        return Ok(None);
    };
    diesel::insert_into(positions::table)
        .values(row)
        .on_conflict((
            positions::user_id,
            positions::asset_id,
            positions::purchase_time,
        ))
        .do_update()
        .set(positions::quantity.eq(next))
        .execute(conn)?;
    Ok(Some(next))
}
