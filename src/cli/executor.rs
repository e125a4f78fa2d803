//! Command executor for dispatching CLI commands

use super::handlers::{SendCommandHandler, ServeCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::Settings;
use crate::error::AppResult;

/// Execute a CLI command with merged settings.
///
/// No subcommand means `serve`.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    match &cli.command {
        Some(Commands::Serve {
            host,
            port,
            dry_run,
            ..
        }) => {
            warn_on_privileged_bind(host.as_deref(), *port);
            ServeCommandHandler::new(settings).execute(*dry_run).await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
        Some(Commands::Send(args)) => SendCommandHandler::new(settings).execute(args).await,
    }
}

fn warn_on_privileged_bind(host: Option<&str>, port: Option<u16>) {
    if let (Some("0.0.0.0"), Some(port)) = (host, port)
        && port < 1024
    {
        tracing::warn!(
            port,
            "Binding to 0.0.0.0 on a privileged port typically requires root privileges"
        );
    }
}
