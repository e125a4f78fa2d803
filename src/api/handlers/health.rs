//! Health check endpoint handlers.
//!
//! The credential component is what separates a ready instance from a
//! degraded one: without a cached token the next send pays for a refresh.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};
use jiff::Timestamp;

use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::state::AppState;

/// Creates health check routes.
///
/// # Routes
/// - `GET /health` - Component report from cached state only
/// - `GET /health/ready` - Readiness probe, obtains a credential if needed
/// - `GET /health/live` - Liveness probe
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/live", get(liveness_check))
}

fn single_check(name: &str, component: ComponentHealth) -> HealthResponse {
    let mut checks = BTreeMap::new();
    checks.insert(name.to_string(), component);
    HealthResponse::from_checks(checks)
}

fn status_code(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Never triggers a credential refresh.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let credentials = state.services.dispatcher.credentials();
    let component = match credentials.peek() {
        Some(credential) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: Some(format!(
                "{} token valid for {}s",
                credentials.source_name(),
                credential.remaining_at(Timestamp::now()).as_secs()
            )),
            response_time_ms: None,
        },
        None => ComponentHealth {
            status: HealthStatus::Degraded,
            message: Some(format!(
                "no valid {} token cached",
                credentials.source_name()
            )),
            response_time_ms: None,
        },
    };

    let response = single_check("credentials", component);
    (status_code(response.status), Json(response))
}

/// Ready once a credential can be obtained.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let start = Instant::now();
    let result = state.services.dispatcher.credentials().get_valid_token().await;
    let response_time_ms = Some(start.elapsed().as_millis() as u64);

    let component = match result {
        Ok(_) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check could not obtain a credential");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
                response_time_ms,
            }
        }
    };

    let response = single_check("credentials", component);
    (status_code(response.status), Json(response))
}

pub async fn liveness_check() -> Json<HealthResponse> {
    Json(HealthResponse::from_checks(BTreeMap::new()))
}
