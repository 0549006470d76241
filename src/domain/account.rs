//! Account state: balances, inventory rows and share positions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AssetId, ItemId, UserId};
use super::record::Record;

/// Add `delta` to `current`, flooring the result at zero.
///
/// Overdrafts are not rejected: the balance simply bottoms out.
#[must_use]
pub fn clamp_add(current: i64, delta: i64) -> i64 {
    current.saturating_add(delta).max(0)
}

/// A player account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub balance: i64,
    pub armor: i64,
    pub activity_points: i64,
    pub last_activity: DateTime<Utc>,
}

impl User {
    /// Read one of the clamped counters.
    #[must_use]
    pub fn counter(&self, field: UserField) -> i64 {
        match field {
            UserField::Balance => self.balance,
            UserField::Armor => self.armor,
            UserField::ActivityPoints => self.activity_points,
        }
    }

    /// Profile view handed to presentation code.
    #[must_use]
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            balance: self.balance,
            armor: self.armor,
            activity_points: self.activity_points,
        }
    }
}

/// Partial update for a [`User`]. Counters are floored at zero when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub balance: Option<i64>,
    pub armor: Option<i64>,
    pub activity_points: Option<i64>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Record for User {
    type Key = UserId;
    type Patch = UserPatch;

    fn key(&self) -> &UserId {
        &self.id
    }

    fn create(key: UserId, patch: &UserPatch, now: DateTime<Utc>) -> Self {
        let mut user = Self {
            id: key,
            balance: 0,
            armor: 0,
            activity_points: 0,
            last_activity: now,
        };
        user.apply(patch);
        user
    }

    fn apply(&mut self, patch: &UserPatch) {
        if let Some(balance) = patch.balance {
            self.balance = balance.max(0);
        }
        if let Some(armor) = patch.armor {
            self.armor = armor.max(0);
        }
        if let Some(points) = patch.activity_points {
            self.activity_points = points.max(0);
        }
        if let Some(at) = patch.last_activity {
            self.last_activity = at;
        }
    }
}

/// The non-negative counters on an account that support add-and-clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Balance,
    Armor,
    ActivityPoints,
}

impl UserField {
    /// Storage column backing this counter.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Armor => "armor",
            Self::ActivityPoints => "activity_points",
        }
    }
}

/// `{balance, armor, activity_points}` snapshot for profile displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: i64,
    pub armor: i64,
    pub activity_points: i64,
}

/// One inventory row. Quantity is always positive; empty rows are deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserItem {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub quantity: i64,
}

/// A block of shares bought at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: UserId,
    pub asset_id: AssetId,
    pub purchase_time: DateTime<Utc>,
    pub quantity: i64,
    pub purchase_price: i64,
}
