//! Item and command catalog.

use std::sync::Arc;

use crate::application::cache::CacheAsideStore;
use crate::domain::{CommandId, CommandPatch, CommandSpec, Item, ItemId, ItemPatch};
use crate::error::{LogPersistence, Result};
use crate::port::{Clock, Storage, Table};

/// Read-mostly lookup of purchasable items and command metadata.
pub struct Catalog<S: Storage> {
    items: CacheAsideStore<Item, S>,
    commands: CacheAsideStore<CommandSpec, S>,
}

impl<S: Storage> Catalog<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            items: CacheAsideStore::new(storage.clone(), clock.clone()),
            commands: CacheAsideStore::new(storage, clock),
        }
    }

    pub async fn item(&self, id: &ItemId) -> Result<Option<Item>> {
        self.items.get(id).await.log_persistence("load item")
    }

    /// Every catalog item, ordered by id.
    pub async fn items(&self) -> Result<Vec<Item>> {
        let mut items = Table::<Item>::load_all(self.items.table())
            .await
            .log_persistence("load items")?;
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    /// Create or update an item.
    pub async fn register_item(&self, id: &ItemId, patch: &ItemPatch) -> Result<Item> {
        self.items.set(id, patch).await.log_persistence("register item")
    }

    pub async fn command(&self, id: &CommandId) -> Result<Option<CommandSpec>> {
        self.commands.get(id).await.log_persistence("load command")
    }

    /// Create or update command metadata.
    pub async fn register_command(
        &self,
        id: &CommandId,
        patch: &CommandPatch,
    ) -> Result<CommandSpec> {
        self.commands
            .set(id, patch)
            .await
            .log_persistence("register command")
    }

    /// Reload both tables. Returns `(items, commands)` loaded.
    pub async fn refresh_cache(&self) -> Result<(usize, usize)> {
        let items = self.items.refresh_cache().await?;
        let commands = self.commands.refresh_cache().await?;
        Ok((items, commands))
    }
}
