//! Database model types for Diesel ORM.
//!
//! Timestamps are stored as fixed-width RFC 3339 text with microsecond
//! precision, so text order is time order and SQLite's `strftime` can read
//! them directly.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

use super::schema::{assets, commands, cooldowns, items, positions, user_items, users};
use crate::domain::{
    CommandSpec, Cooldown, Item, Position, PricePoint, User, UserItem,
};
use crate::error::{Error, Result};

/// Encode a timestamp for storage.
pub fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
///
/// # Errors
/// Returns [`Error::Parse`] for text that is not RFC 3339.
pub fn decode_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("bad timestamp '{text}': {e}")))
}

/// Database row for an account.
#[derive(Queryable, Selectable, Insertable, AsChangeset, QueryableByName, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: String,
    pub balance: i64,
    pub armor: i64,
    pub activity_points: i64,
    pub last_activity: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            balance: user.balance,
            armor: user.armor,
            activity_points: user.activity_points,
            last_activity: encode_time(&user.last_activity),
        }
    }
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            last_activity: decode_time(&row.last_activity)?,
            id: row.id.into(),
            balance: row.balance,
            armor: row.armor,
            activity_points: row.activity_points,
        })
    }
}

/// Database row for a catalog item.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ItemRow {
    pub id: String,
    pub price: i64,
    pub description: String,
    pub usage: String,
    pub glyph: String,
}

impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            price: item.price,
            description: item.description.clone(),
            usage: item.usage.clone(),
            glyph: item.glyph.clone(),
        }
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id.into(),
            price: row.price,
            description: row.description,
            usage: row.usage,
            glyph: row.glyph,
        }
    }
}

/// Database row for command metadata.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = commands)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CommandRow {
    pub id: String,
    pub description: String,
    pub usage: String,
    pub cooldown_ms: i64,
    pub is_admin: bool,
}

impl From<&CommandSpec> for CommandRow {
    fn from(command: &CommandSpec) -> Self {
        Self {
            id: command.id.to_string(),
            description: command.description.clone(),
            usage: command.usage.clone(),
            cooldown_ms: command.cooldown_ms,
            is_admin: command.is_admin,
        }
    }
}

impl From<CommandRow> for CommandSpec {
    fn from(row: CommandRow) -> Self {
        Self {
            id: row.id.into(),
            description: row.description,
            usage: row.usage,
            cooldown_ms: row.cooldown_ms,
            is_admin: row.is_admin,
        }
    }
}

/// Database row for one price point.
#[derive(Queryable, Selectable, Insertable, QueryableByName, Debug, Clone)]
#[diesel(table_name = assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceRow {
    pub asset_id: String,
    pub created_at: String,
    pub price: i64,
}

impl From<&PricePoint> for PriceRow {
    fn from(point: &PricePoint) -> Self {
        Self {
            asset_id: point.asset_id.to_string(),
            created_at: encode_time(&point.created_at),
            price: point.price,
        }
    }
}

impl TryFrom<PriceRow> for PricePoint {
    type Error = Error;

    fn try_from(row: PriceRow) -> Result<Self> {
        Ok(Self {
            created_at: decode_time(&row.created_at)?,
            asset_id: row.asset_id.into(),
            price: row.price,
        })
    }
}

/// Database row for an inventory entry.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = user_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserItemRow {
    pub user_id: String,
    pub item_id: String,
    pub quantity: i64,
}

impl From<UserItemRow> for UserItem {
    fn from(row: UserItemRow) -> Self {
        Self {
            user_id: row.user_id.into(),
            item_id: row.item_id.into(),
            quantity: row.quantity,
        }
    }
}

/// Database row for a share position.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = positions)]
pub struct PositionRow {
    pub user_id: String,
    pub asset_id: String,
    pub purchase_time: String,
    pub quantity: i64,
    pub purchase_price: i64,
}

impl From<&Position> for PositionRow {
    fn from(position: &Position) -> Self {
        Self {
            user_id: position.user_id.to_string(),
            asset_id: position.asset_id.to_string(),
            purchase_time: encode_time(&position.purchase_time),
            quantity: position.quantity,
            purchase_price: position.purchase_price,
        }
    }
}

/// Database row for a cooldown.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = cooldowns)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CooldownRow {
    pub user_id: String,
    pub command_id: String,
    pub start_time: String,
}

impl From<&Cooldown> for CooldownRow {
    fn from(cooldown: &Cooldown) -> Self {
        Self {
            user_id: cooldown.user_id.to_string(),
            command_id: cooldown.command_id.to_string(),
            start_time: encode_time(&cooldown.start_time),
        }
    }
}

impl TryFrom<CooldownRow> for Cooldown {
    type Error = Error;

    fn try_from(row: CooldownRow) -> Result<Self> {
        Ok(Self {
            start_time: decode_time(&row.start_time)?,
            user_id: row.user_id.into(),
            command_id: row.command_id.into(),
        })
    }
}

/// Single `total` column of an aggregate query.
#[derive(QueryableByName, Debug, Clone, Copy)]
pub struct TotalRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encoded_times_are_fixed_width_and_ordered() {
        let a = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        assert_eq!(encode_time(&a), "2026-03-04T05:06:07.000000Z");
        assert_eq!(encode_time(&a).len(), encode_time(&b).len());
        assert!(encode_time(&a) < encode_time(&b));
    }

    #[test]
    fn decode_inverts_encode() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
            + chrono::Duration::microseconds(42);
        assert_eq!(decode_time(&encode_time(&at)).unwrap(), at);
        assert!(matches!(decode_time("yesterday"), Err(Error::Parse(_))));
    }
}
