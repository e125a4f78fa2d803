//! Server module for managing HTTP server lifecycle
//!
//! This module handles server initialization, startup, and graceful shutdown.

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::{Environment, Settings};
use crate::services::Services;
use crate::state::AppState;

/// HTTP server manager
pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Start the server and run until shutdown signal
    ///
    /// 1. Logs startup information
    /// 2. Builds the dispatcher and its collaborators
    /// 3. Binds to the configured address
    /// 4. Serves with graceful shutdown
    ///
    /// No credential is fetched at startup; the first send (or readiness
    /// probe) triggers the refresh.
    pub async fn run(self) -> anyhow::Result<()> {
        let environment = Environment::from_env();
        let settings = &self.settings;

        tracing::info!(
            app_name = %settings.application.name,
            app_version = %settings.application.version,
            environment = environment.as_str(),
            "Application starting"
        );

        tracing::info!(
            host = %settings.server.host,
            port = settings.server.port,
            "Server configuration loaded"
        );

        tracing::info!(
            base_url = %settings.provider.base_url,
            project_id = %settings.provider.project_id,
            validate_only = settings.provider.validate_only,
            send_timeout_ms = settings.provider.send_timeout_ms,
            "Provider configuration loaded"
        );

        // Secrets are never logged, only whether they are present
        tracing::info!(
            source = settings.credentials.source.as_str(),
            static_token_configured = settings.credentials.static_token.is_some(),
            refresh_timeout_ms = settings.credentials.refresh_timeout_ms,
            safety_margin_secs = settings.credentials.safety_margin_secs,
            "Credential configuration loaded"
        );

        if environment.is_live() && settings.provider.validate_only {
            tracing::warn!(
                environment = environment.as_str(),
                "provider.validate_only is set; messages will be validated but not delivered"
            );
        }

        let services = Services::from_settings(settings).context("Failed to build services")?;
        let router = create_router(AppState::new(services));
        tracing::info!("Router configured");

        let address = settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;

        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

/// Waits for Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires; the other
/// signal still works.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
