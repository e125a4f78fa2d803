use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::push::{DispatcherBuildError, RequestError, SendOutcome};

/// Application-wide error type for the HTTP and CLI layers.
///
/// The dispatch core never produces these: it reports every send as a
/// [`SendOutcome`]. `AppError` covers request parsing, configuration and
/// wiring failures, plus the CLI's "not delivered" exit path.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Field-level failures collected by `validator`
    #[error("Validation failed: {} field error(s)", errors.len())]
    ValidationErrors { errors: Vec<ValidationFieldError> },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// A send completed without delivering the notification
    #[error("Notification not delivered: {}", outcome.label())]
    DeliveryFailed { outcome: SendOutcome },

    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

/// One failed field from a validated request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

impl AppError {
    pub fn configuration(key: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AppError::Configuration {
            key: key.into(),
            source: source.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = error.field().unwrap_or("settings").to_string();
        AppError::configuration(key, error)
    }
}

impl From<DispatcherBuildError> for AppError {
    fn from(error: DispatcherBuildError) -> Self {
        AppError::configuration("dispatcher", error)
    }
}

impl From<RequestError> for AppError {
    fn from(error: RequestError) -> Self {
        let RequestError::MissingField(field) = error;
        AppError::Validation {
            field: field.to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationFieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| ValidationFieldError {
                    field: field.to_string(),
                    message: failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| failure.code.to_string()),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));

        AppError::ValidationErrors { errors }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_keeps_field_as_key() {
        let err: AppError = ConfigError::validation("provider.project_id", "missing").into();
        match err {
            AppError::Configuration { key, .. } => assert_eq!(key, "provider.project_id"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_request_error_becomes_field_validation() {
        let err: AppError = RequestError::MissingField("content").into();
        match err {
            AppError::Validation { field, reason } => {
                assert_eq!(field, "content");
                assert_eq!(reason, "content is required");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_delivery_failed_message_names_outcome() {
        let err = AppError::DeliveryFailed {
            outcome: SendOutcome::RecipientUnregistered,
        };
        assert_eq!(err.to_string(), "Notification not delivered: recipient_unregistered");
    }

    #[test]
    fn test_validation_errors_count_in_message() {
        let err = AppError::ValidationErrors {
            errors: vec![
                ValidationFieldError {
                    field: "user_id".into(),
                    message: "required".into(),
                },
                ValidationFieldError {
                    field: "content".into(),
                    message: "required".into(),
                },
            ],
        };
        assert_eq!(err.to_string(), "Validation failed: 2 field error(s)");
    }
}
