//! Handler for the `history` command.

use std::path::Path;
use std::sync::Arc;

use crate::adapter::inbound::cli::command::HistoryArgs;
use crate::domain::{AssetId, HistoryInterval};
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::{parse_tenant_id, Config};
use crate::port::SystemClock;

/// Execute the history command.
///
/// Prints a JSON array, most recent point first. An unknown asset prints
/// an empty array.
pub async fn execute(config_path: &Path, args: &HistoryArgs) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let tenant = parse_tenant_id(&args.tenant)?;
    let interval: HistoryInterval = args.interval.parse()?;

    let context = bootstrap::open_tenant(&config, tenant, Arc::new(SystemClock)).await?;
    let points = context
        .series()
        .history(&AssetId::new(args.asset.as_str()), interval)
        .await?;

    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}
