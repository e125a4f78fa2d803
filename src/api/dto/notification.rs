//! Notification request and response DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::services::push::{NotificationRequest, SendOutcome};

/// Body of `POST /api/notifications`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendNotificationRequest {
    #[validate(length(min = 1, max = 256, message = "user_id must be between 1 and 256 characters"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,

    #[serde(default)]
    #[validate(length(max = 64, message = "category must be at most 64 characters"))]
    pub category: Option<String>,

    #[serde(default)]
    pub time: Option<String>,

    #[serde(default)]
    #[validate(url(message = "image must be a valid URL"))]
    pub image: Option<String>,

    /// Apply the configured retry policy instead of a single attempt
    #[serde(default)]
    pub retry: bool,
}

impl SendNotificationRequest {
    pub fn into_request(self) -> AppResult<NotificationRequest> {
        let mut request = NotificationRequest::new(self.user_id, self.content)?;
        if let Some(category) = self.category {
            request = request.with_category(category);
        }
        if let Some(time) = self.time {
            request = request.with_time(time);
        }
        if let Some(image) = self.image {
            request = request.with_image(image);
        }
        Ok(request)
    }
}

/// Response body for every send, delivered or not.
#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub delivered: bool,
    #[serde(flatten)]
    pub outcome: SendOutcome,
}

impl From<SendOutcome> for SendNotificationResponse {
    fn from(outcome: SendOutcome) -> Self {
        Self {
            delivered: outcome.is_delivered(),
            outcome,
        }
    }
}
