//! Router fixtures over the recording fakes.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use tower::ServiceExt;

use crate::api::routes::create_router;
use crate::services::Services;
use crate::services::push::RetryPolicy;
use crate::services::push::testing::{
    CountingSource, FakeResolver, RecordingTransport, Reply, dispatcher,
};
use crate::state::AppState;

/// Two immediate attempts
fn test_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        multiplier: 1.0,
        max_delay: Duration::from_millis(1),
        jitter: false,
    }
}

pub(crate) fn test_app_with(
    resolver: FakeResolver,
    source: Arc<CountingSource>,
    reply: Reply,
) -> (Router, AppState) {
    let transport = Arc::new(RecordingTransport::new(reply));
    let dispatcher = dispatcher(resolver, &source, &transport, Duration::from_millis(500));
    let state = AppState::new(Services::new(dispatcher, test_policy()));
    (create_router(state.clone()), state)
}

/// `u1` resolves to `tok123` and the provider accepts everything.
pub(crate) fn test_app(source: Arc<CountingSource>) -> (Router, AppState) {
    test_app_with(
        FakeResolver::default().with("u1", "tok123"),
        source,
        Reply::Respond(200, "{}"),
    )
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub(crate) async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    call(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub(crate) async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    call(app, request).await
}
