//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::build;
use crate::config::Environment as AppEnvironment;

/// Push notification gateway
#[derive(Parser, Debug)]
#[command(name = "pushgate")]
#[command(about = "Push notification gateway with cached provider credentials")]
#[command(long_about = "
Pushgate resolves a user's device token, builds the provider message and
delivers it with a cached, single-flight refreshed bearer credential.

EXAMPLES:
    # Start the server with default configuration
    pushgate serve

    # Start server on custom host and port
    pushgate serve --host 0.0.0.0 --port 8080

    # Use custom configuration file
    pushgate --config /etc/pushgate/production.toml serve

    # Check configuration without starting server
    pushgate serve --dry-run

    # Send one notification and print the outcome
    pushgate send --user alice --content 'Build finished' --category ci
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Replaces the layered default/environment/local files with this single
    /// TOML file. Environment variable overrides still apply.
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection (PUSHGATE_APP_ENV)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    ///
    /// Examples:
    ///   pushgate serve                           # Start with defaults
    ///   pushgate serve --host 0.0.0.0 --port 80  # Bind to all interfaces on port 80
    ///   pushgate serve --dry-run                 # Validate config without starting
    Serve {
        /// Host address to bind to
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Port number to listen on
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level override, takes precedence over --verbose/--quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },

    /// Send one notification and print the outcome as JSON
    ///
    /// Exits non-zero unless the notification was delivered.
    Send(SendArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// Target user id, looked up in the recipient directory
    #[arg(long, value_name = "ID", value_parser = super::validation::validate_non_blank)]
    pub user: String,

    /// Message content
    #[arg(long, value_parser = super::validation::validate_non_blank)]
    pub content: String,

    #[arg(long)]
    pub category: Option<String>,

    /// Display time carried in the data payload
    #[arg(long)]
    pub time: Option<String>,

    /// Image URL shown with the notification
    #[arg(long, value_name = "URL")]
    pub image: Option<String>,

    /// Retry with the configured policy
    #[arg(long)]
    pub retry: bool,
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl From<Environment> for AppEnvironment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => AppEnvironment::Development,
            Environment::Test => AppEnvironment::Test,
            Environment::Staging => AppEnvironment::Staging,
            Environment::Production => AppEnvironment::Production,
        }
    }
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["pushgate"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_serve_options() {
        let cli = Cli::try_parse_from([
            "pushgate", "serve", "--host", "0.0.0.0", "-p", "8080", "--log-level", "warning",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                log_level,
                dry_run,
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert_eq!(log_level, Some(LogLevel::Warn));
                assert!(dry_run);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_send_options() {
        let cli = Cli::try_parse_from([
            "pushgate", "--env", "prod", "send", "--user", "alice", "--content", "fed",
            "--category", "alert", "--retry",
        ])
        .unwrap();
        assert_eq!(cli.env, Some(Environment::Production));
        match cli.command {
            Some(Commands::Send(args)) => {
                assert_eq!(args.user, "alice");
                assert_eq!(args.content, "fed");
                assert_eq!(args.category.as_deref(), Some("alert"));
                assert!(args.image.is_none());
                assert!(args.retry);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_send_requires_user_and_content() {
        assert!(Cli::try_parse_from(["pushgate", "send", "--content", "x"]).is_err());
        assert!(Cli::try_parse_from(["pushgate", "send", "--user", "u"]).is_err());
        assert!(
            Cli::try_parse_from(["pushgate", "send", "--user", "u", "--content", "  "]).is_err()
        );
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["pushgate", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_environment_conversion() {
        assert_eq!(
            AppEnvironment::from(Environment::Staging),
            AppEnvironment::Staging
        );
    }
}
