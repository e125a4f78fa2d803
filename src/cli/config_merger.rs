//! Configuration merger for CLI arguments and config files
//!
//! CLI arguments take precedence over every file and environment layer.

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Settings};

pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Loads the base configuration the CLI points at: `--config` selects a
    /// single file, `--env` overrides the environment layer.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = match cli.config {
            Some(ref path) => ConfigLoader::with_file(path),
            None => ConfigLoader::new()?,
        };
        if let Some(env) = cli.env {
            loader = loader.environment(env.into());
        }
        Ok(Self::new(loader.load()?))
    }

    /// Applies CLI overrides to a copy of the base configuration and
    /// validates the result.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Some(Commands::Serve {
            host,
            port,
            log_level,
            ..
        }) = &cli.command
        {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(level) = log_level {
                config.logger.level = level.as_str().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialSourceKind;
    use clap::Parser;
    use std::io::Write;

    fn valid_base_config() -> Settings {
        let mut config = Settings::default();
        config.provider.project_id = "demo".to_string();
        config.credentials.source = CredentialSourceKind::Static;
        config.credentials.static_token = Some("token".to_string());
        config
    }

    fn merge(args: &[&str]) -> Result<Settings, ConfigError> {
        let cli = Cli::try_parse_from(args).unwrap();
        ConfigurationMerger::new(valid_base_config()).merge_cli_args(&cli)
    }

    #[test]
    fn test_verbose_and_quiet_flags() {
        assert_eq!(merge(&["pushgate", "--verbose"]).unwrap().logger.level, "debug");
        assert_eq!(merge(&["pushgate", "--quiet"]).unwrap().logger.level, "error");
    }

    #[test]
    fn test_serve_overrides() {
        let config = merge(&["pushgate", "serve", "--host", "0.0.0.0", "--port", "8080"]).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_log_level_beats_verbose() {
        let config = merge(&["pushgate", "-v", "serve", "--log-level", "warn"]).unwrap();
        assert_eq!(config.logger.level, "warn");
    }

    #[test]
    fn test_send_leaves_server_untouched() {
        let config = merge(&["pushgate", "send", "--user", "u", "--content", "c"]).unwrap();
        assert_eq!(config.server, valid_base_config().server);
    }

    #[test]
    fn test_merged_config_is_validated() {
        let cli = Cli::try_parse_from(["pushgate"]).unwrap();
        let mut base = valid_base_config();
        base.provider.project_id.clear();
        assert!(ConfigurationMerger::new(base).merge_cli_args(&cli).is_err());
    }

    #[test]
    fn test_base_config_is_not_modified() {
        let cli = Cli::try_parse_from(["pushgate", "serve", "--port", "9999"]).unwrap();
        let merger = ConfigurationMerger::new(valid_base_config());
        merger.merge_cli_args(&cli).unwrap();
        assert_eq!(merger.config(), &valid_base_config());
    }

    #[test]
    fn test_from_cli_reads_config_file() {
        let _lock = crate::config::loader::env_test_lock();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 4100

[provider]
project_id = "from-file"

[credentials]
source = "static"
static_token = "t"
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let cli = Cli::try_parse_from(["pushgate", "--config", path]).unwrap();
        let merged = ConfigurationMerger::from_cli(&cli)
            .unwrap()
            .merge_cli_args(&cli)
            .unwrap();
        assert_eq!(merged.server.port, 4100);
        assert_eq!(merged.provider.project_id, "from-file");
    }
}
