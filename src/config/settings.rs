//! Configuration settings structures for pushgate
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};
use crate::services::push::{MessageTemplate, RetryPolicy};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "pushgate".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/pushgate.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_base_url() -> String {
    "https://fcm.googleapis.com".to_string()
}

fn default_title() -> String {
    MessageTemplate::DEFAULT_TITLE.to_string()
}

fn default_body_prefix() -> String {
    MessageTemplate::DEFAULT_BODY_PREFIX.to_string()
}

fn default_max_payload_bytes() -> usize {
    4096
}

fn default_send_timeout_ms() -> u64 {
    10_000
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/firebase.messaging".to_string()
}

fn default_static_token_ttl_secs() -> u64 {
    3600
}

fn default_refresh_timeout_ms() -> u64 {
    10_000
}

fn default_safety_margin_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============================================================================
// Logger Configuration
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Colors are only emitted when stdout is a terminal
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to an existing file instead of truncating it
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert the file representation into the runtime [`LoggerConfig`].
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let format = self
            .file
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = FileConfig::new(
            self.file.enabled,
            PathBuf::from(self.file.path),
            self.file.append,
            format,
        );

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger", e.to_string()))
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Messaging provider (FCM HTTP v1) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider base URL, without the `/v1/projects/...` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub project_id: String,

    /// Ask the provider to validate the message without delivering it
    #[serde(default)]
    pub validate_only: bool,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_body_prefix")]
    pub body_prefix: String,

    /// Upper bound for the serialized wire message
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Bound applied to recipient lookup and to the provider call
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            project_id: String::new(),
            validate_only: false,
            title: default_title(),
            body_prefix: default_body_prefix(),
            max_payload_bytes: default_max_payload_bytes(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl ProviderConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn template(&self) -> MessageTemplate {
        MessageTemplate::new(self.title.clone(), self.body_prefix.clone())
    }
}

// ============================================================================
// Credential Configuration
// ============================================================================

/// Where bearer credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSourceKind {
    /// Google service-account key file, exchanged for an OAuth access token
    #[default]
    ServiceAccount,
    /// A fixed token, re-issued with a configured lifetime on every refresh
    Static,
}

impl CredentialSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSourceKind::ServiceAccount => "service_account",
            CredentialSourceKind::Static => "static",
        }
    }
}

/// Bearer credential settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsSettings {
    #[serde(default)]
    pub source: CredentialSourceKind,

    /// Path to the service-account JSON key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_path: Option<String>,

    /// Overrides the key file's `token_uri`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_token: Option<String>,

    #[serde(default = "default_static_token_ttl_secs")]
    pub static_token_ttl_secs: u64,

    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// A cached credential is only handed out while it outlives this margin
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: u64,
}

impl Default for CredentialsSettings {
    fn default() -> Self {
        Self {
            source: CredentialSourceKind::default(),
            service_account_path: None,
            token_uri: None,
            scope: default_scope(),
            static_token: None,
            static_token_ttl_secs: default_static_token_ttl_secs(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            safety_margin_secs: default_safety_margin_secs(),
        }
    }
}

impl CredentialsSettings {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }

    pub fn static_token_ttl(&self) -> Duration {
        Duration::from_secs(self.static_token_ttl_secs)
    }
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Caller-side retry settings used by the `send` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_true(),
        }
    }
}

impl RetrySettings {
    pub fn into_policy(self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub credentials: CredentialsSettings,

    /// Static user id to device token directory
    #[serde(default)]
    pub recipients: BTreeMap<String, String>,

    #[serde(default)]
    pub retry: RetrySettings,
}
