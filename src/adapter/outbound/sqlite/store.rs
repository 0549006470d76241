//! SQLite store handle.

use std::path::Path;

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::SqliteConnection;
use tracing::info;

use super::database::connection::{create_pool, run_migrations, DbPool};
use crate::error::{Error, Result};

pub(super) type Conn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// SQLite-backed storage for one tenant.
///
/// Clones share the connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `path` and apply pending
    /// migrations.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created, the pool
    /// cannot be built or a migration fails.
    pub fn open(path: &Path, pool_size: u32) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let url = path
            .to_str()
            .ok_or_else(|| Error::Connection(format!("non UTF-8 path {}", path.display())))?;
        let pool = create_pool(url, pool_size)?;
        let applied = run_migrations(&pool)?;
        if applied > 0 {
            info!(path = %path.display(), applied, "Applied migrations");
        }
        Ok(Self::new(pool))
    }

    pub(super) fn conn(&self) -> Result<Conn> {
        self.pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

pub(super) fn db_err(e: diesel::result::Error) -> Error {
    Error::Database(e.to_string())
}
