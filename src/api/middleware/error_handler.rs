//! Error handler for converting AppError to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;
use crate::services::push::SendOutcome;

/// HTTP status reported for a send outcome.
///
/// - Delivered → 200
/// - RecipientUnregistered → 404
/// - local validation rejection → 422
/// - AuthFailure, ProviderRejected → 502
/// - TransportFailure → 504
pub fn outcome_status(outcome: &SendOutcome) -> StatusCode {
    match outcome {
        SendOutcome::Delivered => StatusCode::OK,
        SendOutcome::RecipientUnregistered => StatusCode::NOT_FOUND,
        _ if outcome.is_local_rejection() => StatusCode::UNPROCESSABLE_ENTITY,
        SendOutcome::AuthFailure { .. } | SendOutcome::ProviderRejected { .. } => {
            StatusCode::BAD_GATEWAY
        }
        SendOutcome::TransportFailure { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Maps an AppError variant to its HTTP status code.
pub fn error_status(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Validation { .. }
        | AppError::ValidationErrors { .. }
        | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::DeliveryFailed { outcome } => outcome_status(outcome),
        AppError::Configuration { .. } | AppError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = error_status(&self);
        let body = match &self {
            AppError::NotFound {
                entity,
                field,
                value,
            } => ErrorResponse::new("NOT_FOUND", self.to_string())
                .with_details(json!({ "entity": entity, "field": field, "value": value })),
            AppError::Validation { field, reason } => {
                ErrorResponse::new("VALIDATION_ERROR", reason.as_str())
                    .with_details(json!({ "field": field }))
            }
            AppError::ValidationErrors { errors } => {
                ErrorResponse::new("VALIDATION_ERROR", self.to_string())
                    .with_details(json!({ "errors": errors }))
            }
            AppError::BadRequest { message } => ErrorResponse::new("BAD_REQUEST", message.as_str()),
            AppError::DeliveryFailed { outcome } => {
                ErrorResponse::new("DELIVERY_FAILED", self.to_string())
                    .with_details(json!(outcome))
            }
            AppError::Configuration { key, source } => {
                tracing::error!(key = %key, error = %source, "Configuration error");
                ErrorResponse::new("CONFIGURATION_ERROR", format!("Configuration error: {key}"))
                    .with_details(json!({ "key": key }))
            }
            // Internal details stay in the logs
            AppError::Internal { source } => {
                tracing::error!(error = ?source, "Internal error");
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred")
            }
        };

        (status, Json(body)).into_response()
    }
}
