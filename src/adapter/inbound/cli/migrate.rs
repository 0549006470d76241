//! Handler for the `migrate` command.

use std::path::Path;

use crate::adapter::inbound::cli::command::MigrateArgs;
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::error::Result;
use crate::infrastructure::config::settings::{parse_tenant_id, Config};

/// Execute the migrate command.
///
/// Opening the store applies any pending migrations.
pub fn execute(config_path: &Path, args: &MigrateArgs) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let tenant = parse_tenant_id(&args.tenant)?;
    let path = config.database.tenant_path(&tenant);
    SqliteStore::open(&path, config.database.pool_size)?;
    println!("Migrated tenant {tenant} at {}", path.display());
    Ok(())
}
