//! Serve command handler

use crate::config::Settings;
use crate::error::AppResult;
use crate::server::Server;

pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Runs the server until shutdown, or only validates with `dry_run`.
    pub async fn execute(self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }
        Server::new(self.config).run().await?;
        Ok(())
    }

    /// Validates configuration without binding or contacting the provider.
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        let provider = &self.config.provider;
        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        println!(
            "✓ Provider project: {} ({})",
            provider.project_id,
            if provider.validate_only {
                "validate only"
            } else {
                "live"
            }
        );
        println!(
            "✓ Credential source: {}",
            self.config.credentials.source.as_str()
        );
        println!(
            "✓ Recipient directory: {} entries",
            self.config.recipients.len()
        );
        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
