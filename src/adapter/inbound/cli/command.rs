//! Command-line interface definitions.
//!
//! Defines the CLI structure for the merchant service using `clap`: run the
//! background jobs, prepare a tenant database, or dump a price history.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Persistent economy service CLI
#[derive(Parser, Debug)]
#[command(name = "merchant")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the merchant CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open every configured tenant and run the price ticker and cleanup jobs
    Run,

    /// Create or upgrade one tenant's database
    Migrate(MigrateArgs),

    /// Print an asset's downsampled price history as JSON
    History(HistoryArgs),
}

/// Arguments for `merchant migrate`.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Tenant identifier
    #[arg(long)]
    pub tenant: String,
}

/// Arguments for `merchant history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Tenant identifier
    #[arg(long)]
    pub tenant: String,

    /// Asset identifier
    #[arg(long)]
    pub asset: String,

    /// Bucket size [minute, hour, day, month]
    #[arg(long, default_value = "minute")]
    pub interval: String,
}
