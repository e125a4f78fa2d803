use clap::Parser;

use pushgate::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = cli::load_and_merge_config(&cli)?;
    cli::init_logger_from_settings(&settings)?;

    tracing::debug!(version = pushgate::pkg_version(), "Starting pushgate");

    cli::execute_command(&cli, settings).await?;
    Ok(())
}
