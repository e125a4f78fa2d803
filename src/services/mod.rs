//! Service layer.
//!
//! [`Services`] wires the push dispatch core to the configured credential
//! source, recipient directory and HTTP transport.

pub mod push;

use std::sync::Arc;

use crate::config::{CredentialSourceKind, CredentialsSettings, Settings};
use crate::error::{AppError, AppResult};
use crate::external::{
    HttpClientConfig, ReqwestTransport, ServiceAccountKey, ServiceAccountSource,
    build_http_client, fcm_endpoint,
};
use push::{
    CacheOptions, CredentialCache, CredentialSource, Dispatcher, MessageBuilder, RetryPolicy,
    StaticRecipientResolver, StaticTokenSource,
};

/// Aggregates all services for convenient access.
///
/// This struct is designed to be used as Axum application state.
/// Cloning is cheap since the dispatcher is shared behind an `Arc`.
#[derive(Clone)]
pub struct Services {
    pub dispatcher: Arc<Dispatcher>,
    pub retry: RetryPolicy,
}

impl Services {
    pub fn new(dispatcher: Dispatcher, retry: RetryPolicy) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            retry,
        }
    }

    /// Builds the production dispatcher from validated settings.
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let client = build_http_client(&HttpClientConfig::default())
            .map_err(|e| AppError::configuration("http_client", e))?;

        let source = credential_source(&settings.credentials, client.clone())?;
        tracing::info!(source = source.name(), "Credential source configured");

        let credentials = CredentialCache::new(
            source,
            CacheOptions {
                safety_margin: settings.credentials.safety_margin(),
                refresh_timeout: settings.credentials.refresh_timeout(),
            },
        );

        let resolver: StaticRecipientResolver = settings
            .recipients
            .iter()
            .map(|(user, token)| (user.as_str(), token.as_str()))
            .collect();
        tracing::info!(recipients = resolver.len(), "Recipient directory loaded");

        let provider = &settings.provider;
        let messages = MessageBuilder::new(provider.template())
            .validate_only(provider.validate_only)
            .max_payload_bytes(provider.max_payload_bytes);

        let dispatcher = Dispatcher::builder()
            .resolver(Arc::new(resolver))
            .credentials(credentials)
            .messages(messages)
            .transport(Arc::new(ReqwestTransport::new(client)))
            .endpoint(fcm_endpoint(&provider.base_url, &provider.project_id))
            .timeout(provider.send_timeout())
            .build()?;

        Ok(Self::new(dispatcher, settings.retry.clone().into_policy()))
    }
}

fn credential_source(
    settings: &CredentialsSettings,
    client: reqwest::Client,
) -> AppResult<Arc<dyn CredentialSource>> {
    match settings.source {
        CredentialSourceKind::ServiceAccount => {
            let path = settings.service_account_path.as_deref().ok_or_else(|| {
                AppError::configuration(
                    "credentials.service_account_path",
                    anyhow::anyhow!("required when credentials.source is service_account"),
                )
            })?;
            let key = ServiceAccountKey::from_file(path)
                .map_err(|e| AppError::configuration("credentials.service_account_path", e))?;
            let mut source = ServiceAccountSource::new(key, client)
                .map_err(|e| AppError::configuration("credentials.service_account_path", e))?
                .with_scope(settings.scope.as_str());
            if let Some(ref token_uri) = settings.token_uri {
                source = source.with_token_uri(token_uri.as_str());
            }
            tracing::info!(
                client_email = source.client_email(),
                token_uri = source.token_uri(),
                "Service account loaded"
            );
            Ok(Arc::new(source))
        }
        CredentialSourceKind::Static => {
            let token = settings.static_token.as_deref().ok_or_else(|| {
                AppError::configuration(
                    "credentials.static_token",
                    anyhow::anyhow!("required when credentials.source is static"),
                )
            })?;
            Ok(Arc::new(StaticTokenSource::new(
                token,
                settings.static_token_ttl(),
            )))
        }
    }
}
