//! Read-mostly catalog entries: purchasable items and command metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CommandId, ItemId};
use super::record::Record;

/// Glyph shown for items that do not define one.
pub const DEFAULT_GLYPH: &str = ":black_small_square:";

/// A purchasable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub price: i64,
    pub description: String,
    pub usage: String,
    pub glyph: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub price: Option<i64>,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub glyph: Option<String>,
}

impl Record for Item {
    type Key = ItemId;
    type Patch = ItemPatch;

    fn key(&self) -> &ItemId {
        &self.id
    }

    fn create(key: ItemId, patch: &ItemPatch, _now: DateTime<Utc>) -> Self {
        let mut item = Self {
            id: key,
            price: 0,
            description: String::new(),
            usage: String::new(),
            glyph: DEFAULT_GLYPH.to_string(),
        };
        item.apply(patch);
        item
    }

    fn apply(&mut self, patch: &ItemPatch) {
        if let Some(price) = patch.price {
            self.price = price.max(0);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(usage) = &patch.usage {
            self.usage.clone_from(usage);
        }
        if let Some(glyph) = &patch.glyph {
            self.glyph.clone_from(glyph);
        }
    }
}

/// Metadata for a dispatchable command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub id: CommandId,
    pub description: String,
    pub usage: String,
    /// Minimum interval between uses by one user, in milliseconds.
    pub cooldown_ms: i64,
    pub is_admin: bool,
}

impl CommandSpec {
    /// Whether successful runs start a cooldown.
    #[must_use]
    pub fn has_cooldown(&self) -> bool {
        self.cooldown_ms > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPatch {
    pub description: Option<String>,
    pub usage: Option<String>,
    pub cooldown_ms: Option<i64>,
    pub is_admin: Option<bool>,
}

impl Record for CommandSpec {
    type Key = CommandId;
    type Patch = CommandPatch;

    fn key(&self) -> &CommandId {
        &self.id
    }

    fn create(key: CommandId, patch: &CommandPatch, _now: DateTime<Utc>) -> Self {
        let mut command = Self {
            id: key,
            description: String::new(),
            usage: String::new(),
            cooldown_ms: 0,
            is_admin: false,
        };
        command.apply(patch);
        command
    }

    fn apply(&mut self, patch: &CommandPatch) {
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(usage) = &patch.usage {
            self.usage.clone_from(usage);
        }
        if let Some(cooldown_ms) = patch.cooldown_ms {
            self.cooldown_ms = cooldown_ms.max(0);
        }
        if let Some(is_admin) = patch.is_admin {
            self.is_admin = is_admin;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_defaults_to_placeholder_glyph() {
        let item = Item::create(ItemId::new("wrench"), &ItemPatch::default(), Utc::now());
        assert_eq!(item.glyph, DEFAULT_GLYPH);
        assert_eq!(item.price, 0);
    }

    #[test]
    fn command_without_cooldown_time_never_cools() {
        let command = CommandSpec::create(
            CommandId::new("bal"),
            &CommandPatch::default(),
            Utc::now(),
        );
        assert!(!command.has_cooldown());
        assert!(!command.is_admin);
    }
}
