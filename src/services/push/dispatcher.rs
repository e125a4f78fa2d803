//! Send orchestration.
//!
//! [`Dispatcher::send`] resolves the recipient, obtains a bearer credential,
//! builds the wire message, performs exactly one provider call and maps
//! every result, including failures, to a [`SendOutcome`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Url;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::services::push::credential::{BearerCredential, CredentialCache};
use crate::services::push::message::MessageBuilder;
use crate::services::push::outcome::{LOCAL_VALIDATION_STATUS, SendOutcome};
use crate::services::push::request::{DeviceToken, NotificationRequest};
use crate::services::push::resolver::RecipientResolver;
use crate::services::push::transport::{Transport, TransportRequest, TransportResponse};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Construction-time misconfiguration; the only fatal dispatch error
#[derive(Debug, Error)]
pub enum DispatcherBuildError {
    #[error("dispatcher requires a {0}")]
    Missing(&'static str),

    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("send timeout must be greater than zero")]
    ZeroTimeout,
}

pub struct Dispatcher {
    resolver: Arc<dyn RecipientResolver>,
    credentials: CredentialCache,
    messages: MessageBuilder,
    transport: Arc<dyn Transport>,
    endpoint: String,
    timeout: Duration,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends one notification. Never fails: every path ends in a [`SendOutcome`].
    ///
    /// Dropping the returned future cancels the provider call. A credential
    /// refresh started by this call keeps running for other callers.
    pub async fn send(&self, request: &NotificationRequest) -> SendOutcome {
        let span = tracing::info_span!(
            "push_send",
            user_id = %request.target_user_id(),
            category = %request.category(),
        );

        async {
            let started = Instant::now();
            let outcome = self.dispatch(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &outcome {
                SendOutcome::Delivered => {
                    tracing::info!(elapsed_ms, "Notification delivered")
                }
                SendOutcome::RecipientUnregistered => {
                    tracing::info!(elapsed_ms, "Recipient has no registered device")
                }
                SendOutcome::AuthFailure { cause } => {
                    tracing::warn!(elapsed_ms, ?cause, "Notification not sent: authentication failed")
                }
                SendOutcome::TransportFailure { detail } => {
                    tracing::warn!(elapsed_ms, %detail, "Notification not sent: transport failure")
                }
                SendOutcome::ProviderRejected { status, body } => {
                    tracing::warn!(elapsed_ms, status, %body, "Notification rejected")
                }
            }

            outcome
        }
        .instrument(span)
        .await
    }

    /// Like [`send`](Self::send), but gives up as soon as `cancel` fires.
    ///
    /// Returns `None` when cancelled; the in-flight provider call is dropped.
    pub async fn send_until_cancelled(
        &self,
        request: &NotificationRequest,
        cancel: &CancellationToken,
    ) -> Option<SendOutcome> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(user_id = %request.target_user_id(), "Send cancelled by caller");
                None
            }
            outcome = self.send(request) => Some(outcome),
        }
    }

    async fn dispatch(&self, request: &NotificationRequest) -> SendOutcome {
        let token = match self.resolve(request.target_user_id()).await {
            Ok(Some(token)) => token,
            Ok(None) => return SendOutcome::RecipientUnregistered,
            Err(outcome) => return outcome,
        };

        let credential = match self.credentials.get_valid_token().await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "No usable credential");
                return SendOutcome::credential_unavailable();
            }
        };

        // Rejected locally; the provider is never called
        let message = match self.messages.build(&token, request) {
            Ok(message) => message,
            Err(e) => {
                return SendOutcome::ProviderRejected {
                    status: LOCAL_VALIDATION_STATUS,
                    body: e.to_string(),
                };
            }
        };

        let headers = BTreeMap::from([
            (
                "Authorization".to_string(),
                format!("Bearer {}", credential.token()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]);
        let post = self.transport.post(TransportRequest {
            url: self.endpoint.clone(),
            headers,
            body: message.into_bytes(),
            timeout: self.timeout,
        });

        match tokio::time::timeout(self.timeout, post).await {
            Ok(Ok(response)) => self.interpret(response, &credential),
            Ok(Err(e)) => SendOutcome::transport_failure(e.to_string()),
            Err(_) => SendOutcome::transport_failure(format!(
                "request timed out after {}ms",
                self.timeout.as_millis()
            )),
        }
    }

    /// Lookup failures are infrastructure failures, reported as transport failures
    async fn resolve(&self, user_id: &str) -> Result<Option<DeviceToken>, SendOutcome> {
        match tokio::time::timeout(self.timeout, self.resolver.resolve(user_id)).await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(e)) => Err(SendOutcome::transport_failure(format!(
                "recipient lookup failed: {e}"
            ))),
            Err(_) => Err(SendOutcome::transport_failure(format!(
                "recipient lookup timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// A 401/403 drops `sent` from the cache unless it was already replaced
    fn interpret(&self, response: TransportResponse, sent: &BearerCredential) -> SendOutcome {
        match response.status {
            _ if response.is_success() => SendOutcome::Delivered,
            401 | 403 => {
                self.credentials.invalidate_if_current(sent);
                SendOutcome::credential_rejected()
            }
            status => SendOutcome::ProviderRejected {
                status,
                body: response.body_text(),
            },
        }
    }
}

/// Collects the dispatcher's collaborators; `build` checks nothing is missing.
#[derive(Default)]
pub struct DispatcherBuilder {
    resolver: Option<Arc<dyn RecipientResolver>>,
    credentials: Option<CredentialCache>,
    messages: Option<MessageBuilder>,
    transport: Option<Arc<dyn Transport>>,
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl DispatcherBuilder {
    pub fn resolver(mut self, resolver: Arc<dyn RecipientResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn credentials(mut self, credentials: CredentialCache) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Defaults to [`MessageBuilder::default`]
    pub fn messages(mut self, messages: MessageBuilder) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Bound for recipient lookup and for the provider call; defaults to 10s
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Dispatcher, DispatcherBuildError> {
        let resolver = self
            .resolver
            .ok_or(DispatcherBuildError::Missing("recipient resolver"))?;
        let credentials = self
            .credentials
            .ok_or(DispatcherBuildError::Missing("credential cache"))?;
        let transport = self
            .transport
            .ok_or(DispatcherBuildError::Missing("transport"))?;
        let endpoint = self
            .endpoint
            .ok_or(DispatcherBuildError::Missing("endpoint"))?;

        match Url::parse(&endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(DispatcherBuildError::InvalidEndpoint {
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                    url: endpoint,
                });
            }
            Err(e) => {
                return Err(DispatcherBuildError::InvalidEndpoint {
                    reason: e.to_string(),
                    url: endpoint,
                });
            }
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_SEND_TIMEOUT);
        if timeout.is_zero() {
            return Err(DispatcherBuildError::ZeroTimeout);
        }

        Ok(Dispatcher {
            resolver,
            credentials,
            messages: self.messages.unwrap_or_default(),
            transport,
            endpoint,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::push::credential::{CacheOptions, CredentialError};
    use crate::services::push::resolver::ResolveError;
    use crate::services::push::testing::{
        CountingSource, ENDPOINT, FakeResolver, Reply, RecordingTransport, dispatcher,
    };
    use crate::services::push::transport::TransportError;

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn fed_for(user: &str) -> NotificationRequest {
        NotificationRequest::new(user, "fed")
            .unwrap()
            .with_category("alert")
            .with_time("12:00")
    }

    fn setup(
        resolver: FakeResolver,
        reply: Reply,
    ) -> (Dispatcher, Arc<CountingSource>, Arc<RecordingTransport>) {
        let source = Arc::new(CountingSource::new());
        let transport = Arc::new(RecordingTransport::new(reply));
        let dispatcher = dispatcher(resolver, &source, &transport, TIMEOUT);
        (dispatcher, source, transport)
    }

    #[tokio::test]
    async fn test_delivered() {
        let (dispatcher, _, transport) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Respond(200, "{}"),
        );

        let outcome = dispatcher.send(&fed_for("u1")).await;

        assert_eq!(outcome, SendOutcome::Delivered);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let (dispatcher, _, transport) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Respond(200, "{}"),
        );

        dispatcher.send(&fed_for("u1")).await;

        let request = &transport.requests()[0];
        assert_eq!(request.url, ENDPOINT);
        assert_eq!(request.timeout, TIMEOUT);
        assert_eq!(request.headers["Authorization"], "Bearer tok-1");
        assert_eq!(request.headers["Content-Type"], "application/json");
        let expected = MessageBuilder::default()
            .build(&DeviceToken::new("tok123"), &fed_for("u1"))
            .unwrap();
        assert_eq!(request.body, expected.as_bytes());
    }

    #[tokio::test]
    async fn test_unregistered_recipient_makes_no_calls() {
        let (dispatcher, source, transport) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Respond(200, "{}"),
        );

        let outcome = dispatcher.send(&fed_for("u2")).await;

        assert_eq!(outcome, SendOutcome::RecipientUnregistered);
        assert_eq!(transport.calls(), 0);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_credential() {
        for status in [401, 403] {
            let (dispatcher, source, _) = setup(
                FakeResolver::default().with("u1", "tok123"),
                Reply::Respond(status, "invalid token"),
            );

            assert_eq!(
                dispatcher.send(&fed_for("u1")).await,
                SendOutcome::credential_rejected()
            );
            assert!(dispatcher.credentials().peek().is_none());
            assert_eq!(source.calls(), 1);

            let next = dispatcher.credentials().get_valid_token().await.unwrap();
            assert_eq!(next.token(), "tok-2");
            assert_eq!(source.calls(), 2);
        }
    }

    #[tokio::test]
    async fn test_hanging_transport_times_out_within_bound() {
        let (dispatcher, _, transport) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Hang,
        );

        let started = Instant::now();
        let outcome = dispatcher.send(&fed_for("u1")).await;
        let elapsed = started.elapsed();

        match outcome {
            SendOutcome::TransportFailure { detail } => assert!(detail.contains("timed out")),
            other => panic!("expected TransportFailure, got {other:?}"),
        }
        assert!(elapsed >= TIMEOUT);
        assert!(elapsed < TIMEOUT + Duration::from_secs(1));
        assert!(transport.was_abandoned());
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let (dispatcher, source, _) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Fail(TransportError::Connect("connection refused".to_string())),
        );

        let outcome = dispatcher.send(&fed_for("u1")).await;

        assert_eq!(
            outcome,
            SendOutcome::transport_failure("connection failed: connection refused")
        );
        // Credential stays cached; the failure says nothing about it
        assert!(dispatcher.credentials().peek().is_some());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_rejection_keeps_status_and_body() {
        let (dispatcher, _, _) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Respond(404, r#"{"error":{"status":"NOT_FOUND"}}"#),
        );

        let outcome = dispatcher.send(&fed_for("u1")).await;

        assert_eq!(
            outcome,
            SendOutcome::ProviderRejected {
                status: 404,
                body: r#"{"error":{"status":"NOT_FOUND"}}"#.to_string(),
            }
        );
        assert!(!outcome.is_retryable());
        assert!(dispatcher.credentials().peek().is_some());
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_rejection() {
        let (dispatcher, _, _) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Respond(503, "unavailable"),
        );

        let outcome = dispatcher.send(&fed_for("u1")).await;
        assert!(matches!(outcome, SendOutcome::ProviderRejected { status: 503, .. }));
        assert!(outcome.is_retryable());
    }

    #[tokio::test]
    async fn test_credential_failure_is_auth_failure() {
        let source = Arc::new(
            CountingSource::new().then(Err(CredentialError::Unreachable("dns".to_string()))),
        );
        let transport = Arc::new(RecordingTransport::new(Reply::Respond(200, "{}")));
        let dispatcher = dispatcher(
            FakeResolver::default().with("u1", "tok123"),
            &source,
            &transport,
            TIMEOUT,
        );

        assert_eq!(
            dispatcher.send(&fed_for("u1")).await,
            SendOutcome::credential_unavailable()
        );
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_message_rejected_locally() {
        let (dispatcher, source, transport) = setup(
            FakeResolver::default().with("u1", "tok123").with("u3", ""),
            Reply::Respond(200, "{}"),
        );

        let oversized = NotificationRequest::new("u1", "x".repeat(8000)).unwrap();
        let outcome = dispatcher.send(&oversized).await;
        assert!(outcome.is_local_rejection());

        let blank = dispatcher.send(&fed_for("u3")).await;
        assert_eq!(
            blank,
            SendOutcome::ProviderRejected {
                status: LOCAL_VALIDATION_STATUS,
                body: "device token is empty".to_string(),
            }
        );

        assert_eq!(transport.calls(), 0);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolver_failure_and_timeout() {
        let (dispatcher, _, transport) = setup(
            FakeResolver::default().failing(ResolveError::Unavailable("db down".to_string())),
            Reply::Respond(200, "{}"),
        );
        let outcome = dispatcher.send(&fed_for("u1")).await;
        assert!(matches!(
            outcome,
            SendOutcome::TransportFailure { ref detail } if detail.contains("db down")
        ));
        assert_eq!(transport.calls(), 0);

        let (dispatcher, _, _) = setup(
            FakeResolver::default()
                .with("u1", "tok123")
                .slow(Duration::from_secs(5)),
            Reply::Respond(200, "{}"),
        );
        let started = Instant::now();
        let outcome = dispatcher.send(&fed_for("u1")).await;
        assert!(matches!(
            outcome,
            SendOutcome::TransportFailure { ref detail } if detail.contains("lookup timed out")
        ));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_cancellation_drops_transport_call() {
        let (dispatcher, _, transport) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Hang,
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = dispatcher.send_until_cancelled(&fed_for("u1"), &cancel).await;

        assert_eq!(outcome, None);
        assert_eq!(transport.calls(), 1);
        assert!(transport.was_abandoned());
        // The credential obtained before cancelling is still cached
        assert!(dispatcher.credentials().peek().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_sends_share_one_refresh() {
        let source = Arc::new(CountingSource::with_delay(Duration::from_millis(30)));
        let transport = Arc::new(RecordingTransport::new(Reply::Respond(200, "{}")));
        let dispatcher = dispatcher(
            FakeResolver::default().with("u1", "tok123"),
            &source,
            &transport,
            TIMEOUT,
        );
        let request = fed_for("u1");

        let outcomes =
            futures::future::join_all((0..20).map(|_| dispatcher.send(&request))).await;

        assert!(outcomes.iter().all(SendOutcome::is_delivered));
        assert_eq!(source.calls(), 1);
        assert_eq!(transport.calls(), 20);
    }

    #[tokio::test]
    async fn test_concurrent_rejections_trigger_one_refresh() {
        let (dispatcher, source, transport) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Respond(401, "invalid token"),
        );
        let request = fed_for("u1");

        let tokens = futures::future::join_all((0..20).map(|_| async {
            let outcome = dispatcher.send(&request).await;
            assert_eq!(outcome, SendOutcome::credential_rejected());
            dispatcher.credentials().get_valid_token().await.unwrap()
        }))
        .await;

        assert_eq!(transport.calls(), 20);
        assert_eq!(source.calls(), 2);
        assert!(tokens.iter().all(|t| t.token() == "tok-2"));
    }

    #[tokio::test]
    async fn test_late_rejection_keeps_newer_credential() {
        let (dispatcher, source, _) = setup(
            FakeResolver::default().with("u1", "tok123"),
            Reply::Respond(401, "invalid token"),
        );

        let stale = dispatcher.credentials().get_valid_token().await.unwrap();
        dispatcher.send(&fed_for("u1")).await;
        let fresh = dispatcher.credentials().get_valid_token().await.unwrap();
        assert_eq!(fresh.token(), "tok-2");

        // A response to a request sent with tok-1 arrives after the refresh
        let outcome = dispatcher.interpret(TransportResponse::new(401, "invalid token"), &stale);

        assert_eq!(outcome, SendOutcome::credential_rejected());
        assert_eq!(dispatcher.credentials().peek(), Some(fresh));
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_builder_reports_missing_parts() {
        let result = Dispatcher::builder().build();
        assert!(matches!(result, Err(DispatcherBuildError::Missing("recipient resolver"))));

        let source = Arc::new(CountingSource::new());
        let result = Dispatcher::builder()
            .resolver(Arc::new(FakeResolver::default()))
            .credentials(CredentialCache::new(source, CacheOptions::default()))
            .endpoint(ENDPOINT)
            .build();
        assert!(matches!(result, Err(DispatcherBuildError::Missing("transport"))));
    }

    #[test]
    fn test_builder_validates_endpoint_and_timeout() {
        let build = |endpoint: &str, timeout: Duration| {
            Dispatcher::builder()
                .resolver(Arc::new(FakeResolver::default()))
                .credentials(CredentialCache::new(
                    Arc::new(CountingSource::new()),
                    CacheOptions::default(),
                ))
                .transport(Arc::new(RecordingTransport::new(Reply::Hang)))
                .endpoint(endpoint)
                .timeout(timeout)
                .build()
        };

        assert!(matches!(
            build("ftp://push.test/send", TIMEOUT),
            Err(DispatcherBuildError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            build("not a url", TIMEOUT),
            Err(DispatcherBuildError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            build(ENDPOINT, Duration::ZERO),
            Err(DispatcherBuildError::ZeroTimeout)
        ));
        assert!(build(ENDPOINT, TIMEOUT).is_ok());
    }
}
