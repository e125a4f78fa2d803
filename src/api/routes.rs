//! Router configuration for the API.

use axum::{Router, middleware};

use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Middleware is applied in reverse order of declaration (last added runs first):
/// 1. Request ID middleware (runs first) - generates/propagates request IDs
/// 2. Logging middleware (runs second) - logs requests with request IDs
///
/// # Routes
/// - `/health`, `/health/ready`, `/health/live` - Health probes
/// - `/api/notifications` - Notification dispatch
pub fn create_router(state: AppState) -> Router {
    let api_routes =
        Router::new().nest("/notifications", handlers::notifications::notification_routes());

    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api", api_routes)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::api::middleware::REQUEST_ID_HEADER;
    use crate::api::testing::test_app;
    use crate::services::push::testing::CountingSource;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (app, _) = test_app(Arc::new(CountingSource::new()));
        let response = app
            .oneshot(Request::builder().uri("/api/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_every_response_has_request_id() {
        let (app, _) = test_app(Arc::new(CountingSource::new()));
        let response = app
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_get_on_send_route_is_rejected() {
        let (app, _) = test_app(Arc::new(CountingSource::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/notifications")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
