//! Configuration validation logic
//!
//! Each section checks its own invariants; [`Settings::validate`] runs them
//! all and reports the first failure.

use reqwest::Url;

use crate::config::error::ConfigError;
use crate::config::settings::{
    CredentialSourceKind, CredentialsSettings, LoggerSettings, ProviderConfig, RetrySettings,
    ServerConfig, Settings,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

fn require_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(ConfigError::validation(
            field,
            format!("Unsupported URL scheme '{}'. Use http or https.", url.scheme()),
        )),
        Err(e) => Err(ConfigError::validation(field, format!("Invalid URL '{value}': {e}"))),
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::validation("server.host", "Host must not be empty."));
        }

        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// # Validation Rules
    /// - Level is one of trace/debug/info/warn/error (case-insensitive)
    /// - File format is one of full/compact/json
    /// - File path is set when file output is enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid values are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.file.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid values are: {}",
                    self.file.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }

        if self.file.enabled && self.file.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        Ok(())
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url("provider.base_url", &self.base_url)?;

        if self.project_id.trim().is_empty() {
            return Err(ConfigError::validation(
                "provider.project_id",
                "Project id is required to build the send endpoint.",
            ));
        }

        if self.project_id.contains('/') {
            return Err(ConfigError::validation(
                "provider.project_id",
                "Project id must not contain '/'.",
            ));
        }

        if self.max_payload_bytes == 0 {
            return Err(ConfigError::validation(
                "provider.max_payload_bytes",
                "Payload limit must be greater than 0.",
            ));
        }

        if self.send_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "provider.send_timeout_ms",
                "Send timeout must be greater than 0 milliseconds.",
            ));
        }

        Ok(())
    }
}

impl CredentialsSettings {
    /// # Validation Rules
    /// - `service_account` needs `service_account_path`
    /// - `static` needs a non-empty `static_token` that outlives the safety margin
    /// - `token_uri`, when set, is an http(s) URL
    /// - Refresh timeout is greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            CredentialSourceKind::ServiceAccount => {
                let missing = self
                    .service_account_path
                    .as_deref()
                    .is_none_or(|p| p.trim().is_empty());
                if missing {
                    return Err(ConfigError::validation(
                        "credentials.service_account_path",
                        "A service account key path is required when source = \"service_account\".",
                    ));
                }
            }
            CredentialSourceKind::Static => {
                let missing = self
                    .static_token
                    .as_deref()
                    .is_none_or(|t| t.trim().is_empty());
                if missing {
                    return Err(ConfigError::validation(
                        "credentials.static_token",
                        "A token is required when source = \"static\".",
                    ));
                }

                if self.static_token_ttl_secs <= self.safety_margin_secs {
                    return Err(ConfigError::validation(
                        "credentials.static_token_ttl_secs",
                        format!(
                            "Token lifetime ({}s) must exceed the safety margin ({}s).",
                            self.static_token_ttl_secs, self.safety_margin_secs
                        ),
                    ));
                }
            }
        }

        if let Some(ref uri) = self.token_uri {
            require_http_url("credentials.token_uri", uri)?;
        }

        if self.scope.trim().is_empty() {
            return Err(ConfigError::validation("credentials.scope", "Scope must not be empty."));
        }

        if self.refresh_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "credentials.refresh_timeout_ms",
                "Refresh timeout must be greater than 0 milliseconds.",
            ));
        }

        Ok(())
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::validation(
                "retry.max_attempts",
                "At least one attempt is required.",
            ));
        }

        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::validation(
                "retry.multiplier",
                format!("Multiplier must be a finite number >= 1.0, got {}.", self.multiplier),
            ));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::validation(
                "retry.max_delay_ms",
                format!(
                    "Max delay ({}ms) cannot be below the base delay ({}ms).",
                    self.max_delay_ms, self.base_delay_ms
                ),
            ));
        }

        Ok(())
    }
}

impl Settings {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logger.validate()?;
        self.provider.validate()?;
        self.credentials.validate()?;
        self.retry.validate()?;

        if self.recipients.keys().any(|user| user.trim().is_empty()) {
            return Err(ConfigError::validation(
                "recipients",
                "Recipient user ids must not be empty.",
            ));
        }

        Ok(())
    }
}
