#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use merchant::adapter::outbound::sqlite::SqliteStore;
use merchant::application::{EconomySettings, TenantContext};
use merchant::domain::TenantId;
use merchant::port::Clock;
use tempfile::TempDir;

/// Temporary SQLite database for integration tests, removed on drop.
pub struct TempDb {
    dir: TempDir,
    path: PathBuf,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(format!("{name}.db"));
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// A store over this database with migrations applied.
    pub fn store(&self) -> SqliteStore {
        SqliteStore::open(&self.path, 4).expect("open sqlite store")
    }

    /// A tenant over this database, caches not yet warmed.
    pub fn tenant(&self, clock: Arc<dyn Clock>) -> TenantContext<SqliteStore> {
        self.tenant_with(&EconomySettings::default(), clock)
    }

    pub fn tenant_with(
        &self,
        settings: &EconomySettings,
        clock: Arc<dyn Clock>,
    ) -> TenantContext<SqliteStore> {
        TenantContext::new(TenantId::new("test"), self.store(), settings, clock)
    }

    /// A tenant over this database, warmed from whatever is stored.
    pub async fn reopen(&self, clock: Arc<dyn Clock>) -> TenantContext<SqliteStore> {
        self.open_as("test", clock).await
    }

    pub async fn open_as(&self, id: &str, clock: Arc<dyn Clock>) -> TenantContext<SqliteStore> {
        TenantContext::open(
            TenantId::new(id),
            self.store(),
            &EconomySettings::default(),
            clock,
        )
        .await
        .expect("open tenant")
    }
}

/// Write `contents` to `config.toml` inside `dir`.
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, contents).expect("write temp config");
    path
}
