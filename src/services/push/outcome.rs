//! Per-send results.

use serde::{Deserialize, Serialize};

/// Status reported for a request rejected locally, before any network call.
pub const LOCAL_VALIDATION_STATUS: u16 = 422;

/// The single result of one `Dispatcher::send` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    Delivered,
    /// The user has no device token; terminal, not an error
    RecipientUnregistered,
    /// Credential could not be obtained or was refused by the provider
    AuthFailure { cause: AuthFailureCause },
    /// No response: connect failure, timeout, lookup failure
    TransportFailure { detail: String },
    /// Provider answered with a non-2xx status other than 401/403, or the
    /// message failed local validation (`LOCAL_VALIDATION_STATUS`)
    ProviderRejected { status: u16, body: String },
}

/// Why a send ended in [`SendOutcome::AuthFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureCause {
    /// The credential source failed; nothing was sent
    CredentialUnavailable,
    /// The provider answered 401/403 and the cached credential was dropped
    CredentialRejected,
}

/// How a caller may retry a given outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Never,
    /// The credential cache was already invalidated
    Immediately,
    AfterBackoff,
}

impl SendOutcome {
    pub fn transport_failure(detail: impl Into<String>) -> Self {
        SendOutcome::TransportFailure {
            detail: detail.into(),
        }
    }

    pub fn credential_unavailable() -> Self {
        SendOutcome::AuthFailure {
            cause: AuthFailureCause::CredentialUnavailable,
        }
    }

    pub fn credential_rejected() -> Self {
        SendOutcome::AuthFailure {
            cause: AuthFailureCause::CredentialRejected,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }

    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            SendOutcome::ProviderRejected { status, .. } if *status == LOCAL_VALIDATION_STATUS
        )
    }

    pub fn retry_class(&self) -> RetryClass {
        match self {
            SendOutcome::Delivered | SendOutcome::RecipientUnregistered => RetryClass::Never,
            SendOutcome::AuthFailure { cause } => match cause {
                AuthFailureCause::CredentialRejected => RetryClass::Immediately,
                AuthFailureCause::CredentialUnavailable => RetryClass::AfterBackoff,
            },
            SendOutcome::TransportFailure { .. } => RetryClass::AfterBackoff,
            SendOutcome::ProviderRejected { status, .. } => match *status {
                429 | 500..=599 => RetryClass::AfterBackoff,
                _ => RetryClass::Never,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_class() != RetryClass::Never
    }

    /// Stable snake_case name, matching the serialized tag
    pub fn label(&self) -> &'static str {
        match self {
            SendOutcome::Delivered => "delivered",
            SendOutcome::RecipientUnregistered => "recipient_unregistered",
            SendOutcome::AuthFailure { .. } => "auth_failure",
            SendOutcome::TransportFailure { .. } => "transport_failure",
            SendOutcome::ProviderRejected { .. } => "provider_rejected",
        }
    }
}
