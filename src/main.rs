use anyhow::Context;
use clap::Parser;
use merchant::adapter::inbound::cli::{self, command::Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli.config.clone();
    cli::execute(cli)
        .await
        .with_context(|| format!("merchant failed (config: {})", config.display()))
}
