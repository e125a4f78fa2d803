//! Notification API handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::api::dto::{SendNotificationRequest, SendNotificationResponse};
use crate::api::extract::ValidatedJson;
use crate::api::middleware::outcome_status;
use crate::error::AppResult;
use crate::services::push::send_with_retry;
use crate::state::AppState;

/// Routes:
/// - POST / - Send one notification to a user
pub fn notification_routes() -> Router<AppState> {
    Router::new().route("/", post(send_notification))
}

/// POST /api/notifications
///
/// Every completed send answers with the outcome body; the status code
/// reflects the outcome (see [`outcome_status`]).
async fn send_notification(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SendNotificationRequest>,
) -> AppResult<(StatusCode, Json<SendNotificationResponse>)> {
    let retry = body.retry;
    let request = body.into_request()?;
    let services = &state.services;

    let outcome = if retry {
        send_with_retry(&services.dispatcher, &request, &services.retry).await
    } else {
        services.dispatcher.send(&request).await
    };

    Ok((outcome_status(&outcome), Json(outcome.into())))
}
