//! Provider wire payloads.
//!
//! The payload is a plain serde struct so field order is fixed by
//! declaration order, and the serialized bytes are produced once at build
//! time. Nothing random or clock-derived goes into a message.

use serde::Serialize;
use thiserror::Error;

use crate::services::push::request::{DeviceToken, NotificationRequest};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("device token is empty")]
    EmptyToken,

    #[error("payload is {size} bytes, provider limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("payload could not be encoded: {0}")]
    Encoding(String),
}

/// Fixed title and body prefix applied to every notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub title: String,
    pub body_prefix: String,
}

impl MessageTemplate {
    pub const DEFAULT_TITLE: &'static str = "New message";
    pub const DEFAULT_BODY_PREFIX: &'static str = "You have a new message: ";

    pub fn new(title: impl Into<String>, body_prefix: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body_prefix: body_prefix.into(),
        }
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TITLE, Self::DEFAULT_BODY_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Payload {
    validate_only: bool,
    message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Message {
    token: String,
    notification: Notification,
    data: Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Notification {
    title: String,
    body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct Data {
    category: String,
    content: String,
    time: String,
    image: String,
}

/// One serialized provider message, scoped to a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    payload: Payload,
    encoded: Vec<u8>,
}

impl WireMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.encoded
    }

    pub fn validate_only(&self) -> bool {
        self.payload.validate_only
    }

    pub fn title(&self) -> &str {
        &self.payload.message.notification.title
    }

    pub fn body(&self) -> &str {
        &self.payload.message.notification.body
    }
}

/// Maps a device token and request to a [`WireMessage`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    template: MessageTemplate,
    validate_only: bool,
    max_payload_bytes: usize,
}

impl MessageBuilder {
    pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

    pub fn new(template: MessageTemplate) -> Self {
        Self {
            template,
            validate_only: false,
            max_payload_bytes: Self::DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    pub fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    pub fn max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    /// Builds the message, rejecting blank tokens and oversized payloads.
    ///
    /// Content is never truncated to fit.
    pub fn build(
        &self,
        token: &DeviceToken,
        request: &NotificationRequest,
    ) -> Result<WireMessage, ValidationError> {
        if token.is_blank() {
            return Err(ValidationError::EmptyToken);
        }

        let payload = Payload {
            validate_only: self.validate_only,
            message: Message {
                token: token.as_str().to_string(),
                notification: Notification {
                    title: self.template.title.clone(),
                    body: format!("{}{}", self.template.body_prefix, request.content()),
                },
                data: Data {
                    category: request.category().to_string(),
                    content: request.content().to_string(),
                    time: request.time().to_string(),
                    image: request.image().to_string(),
                },
            },
        };

        let encoded =
            serde_json::to_vec(&payload).map_err(|e| ValidationError::Encoding(e.to_string()))?;
        if encoded.len() > self.max_payload_bytes {
            return Err(ValidationError::PayloadTooLarge {
                size: encoded.len(),
                limit: self.max_payload_bytes,
            });
        }

        Ok(WireMessage { payload, encoded })
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(MessageTemplate::default())
    }
}
