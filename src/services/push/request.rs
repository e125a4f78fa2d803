//! Logical notification requests and device tokens.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// What to notify and whom, before any provider formatting.
///
/// Fields are private so a constructed request always carries a target user
/// and content; optional fields default to empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    target_user_id: String,
    category: String,
    content: String,
    time: String,
    image: String,
}

impl NotificationRequest {
    pub fn new(
        target_user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, RequestError> {
        let target_user_id = target_user_id.into();
        let content = content.into();

        if target_user_id.trim().is_empty() {
            return Err(RequestError::MissingField("target_user_id"));
        }
        if content.trim().is_empty() {
            return Err(RequestError::MissingField("content"));
        }

        Ok(Self {
            target_user_id,
            category: String::new(),
            content,
            time: String::new(),
            image: String::new(),
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    /// Image URI shown with the notification
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn target_user_id(&self) -> &str {
        &self.target_user_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn image(&self) -> &str {
        &self.image
    }
}

/// Opaque provider registration token of one device.
///
/// An empty value is representable on purpose: a directory can hold a blank
/// token, which is not the same as having no token at all (`None`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DeviceToken(String);

impl DeviceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Device tokens identify a person's phone; keep them out of logs.
impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: String = self.0.chars().take(6).collect();
        write!(f, "DeviceToken({shown}..)")
    }
}
