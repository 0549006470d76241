//! Items and command metadata.

use diesel::prelude::*;

use super::database::model::{CommandRow, ItemRow};
use super::database::schema::{commands, items};
use super::store::{db_err, SqliteStore};
use crate::domain::{CommandId, CommandSpec, Item, ItemId};
use crate::error::{Error, Result};
use crate::port::{MutableTable, Table};

impl Table<Item> for SqliteStore {
    async fn find(&self, key: &ItemId) -> Result<Option<Item>> {
        let mut conn = self.conn()?;
        let row: Option<ItemRow> = items::table
            .find(key.as_str())
            .select(ItemRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        Ok(row.map(Item::from))
    }

    async fn insert(&self, row: &Item) -> Result<Item> {
        let mut conn = self.conn()?;
        diesel::insert_into(items::table)
            .values(ItemRow::from(row))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(row.clone())
    }

    async fn delete(&self, key: &ItemId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(items::table.find(key.as_str()))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(deleted > 0)
    }

    async fn load_all(&self) -> Result<Vec<Item>> {
        let mut conn = self.conn()?;
        let rows: Vec<ItemRow> = items::table
            .select(ItemRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Item::from).collect())
    }
}

impl MutableTable<Item> for SqliteStore {
    async fn update(&self, row: &Item) -> Result<Item> {
        let mut conn = self.conn()?;
        let updated = diesel::update(items::table.find(row.id.as_str()))
            .set(ItemRow::from(row))
            .execute(&mut conn)
            .map_err(db_err)?;
        if updated == 0 {
            return Err(Error::Database(format!("no item {}", row.id)));
        }
        Ok(row.clone())
    }
}

impl Table<CommandSpec> for SqliteStore {
    async fn find(&self, key: &CommandId) -> Result<Option<CommandSpec>> {
        let mut conn = self.conn()?;
        let row: Option<CommandRow> = commands::table
            .find(key.as_str())
            .select(CommandRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(db_err)?;
        Ok(row.map(CommandSpec::from))
    }

    async fn insert(&self, row: &CommandSpec) -> Result<CommandSpec> {
        let mut conn = self.conn()?;
        diesel::insert_into(commands::table)
            .values(CommandRow::from(row))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(row.clone())
    }

    async fn delete(&self, key: &CommandId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(commands::table.find(key.as_str()))
            .execute(&mut conn)
            .map_err(db_err)?;
        Ok(deleted > 0)
    }

    async fn load_all(&self) -> Result<Vec<CommandSpec>> {
        let mut conn = self.conn()?;
        let rows: Vec<CommandRow> = commands::table
            .select(CommandRow::as_select())
            .load(&mut conn)
            .map_err(db_err)?;
        Ok(rows.into_iter().map(CommandSpec::from).collect())
    }
}

impl MutableTable<CommandSpec> for SqliteStore {
    async fn update(&self, row: &CommandSpec) -> Result<CommandSpec> {
        let mut conn = self.conn()?;
        let updated = diesel::update(commands::table.find(row.id.as_str()))
            .set(CommandRow::from(row))
            .execute(&mut conn)
            .map_err(db_err)?;
        if updated == 0 {
            return Err(Error::Database(format!("no command {}", row.id)));
        }
        Ok(row.clone())
    }
}
