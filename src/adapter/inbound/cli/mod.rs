//! CLI module graph.

pub mod command;
pub mod history;
pub mod migrate;
pub mod run;

use command::{Cli, Commands};

use crate::error::Result;

/// Dispatch a parsed command line to its handler.
///
/// # Errors
/// Propagates the handler's error.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run => run::execute(&cli.config).await,
        Commands::Migrate(args) => migrate::execute(&cli.config, &args),
        Commands::History(args) => history::execute(&cli.config, &args).await,
    }
}
