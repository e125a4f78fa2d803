//! User id to device token lookup.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::services::push::request::DeviceToken;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("recipient directory unavailable: {0}")]
    Unavailable(String),
}

/// Looks up the device token registered for a user.
///
/// `Ok(None)` means the user has no registered device.
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Result<Option<DeviceToken>, ResolveError>;
}

/// In-memory directory loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticRecipientResolver {
    tokens: HashMap<String, DeviceToken>,
}

impl StaticRecipientResolver {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for StaticRecipientResolver
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tokens: iter
                .into_iter()
                .map(|(user, token)| (user.into(), DeviceToken::new(token)))
                .collect(),
        }
    }
}

#[async_trait]
impl RecipientResolver for StaticRecipientResolver {
    async fn resolve(&self, user_id: &str) -> Result<Option<DeviceToken>, ResolveError> {
        Ok(self.tokens.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_lookup() {
        let resolver: StaticRecipientResolver = [("u1", "tok123"), ("u3", "")].into_iter().collect();

        assert_eq!(resolver.resolve("u1").await, Ok(Some(DeviceToken::new("tok123"))));
        assert_eq!(resolver.resolve("u2").await, Ok(None));
        assert_eq!(resolver.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_entry_is_present_not_absent() {
        let resolver: StaticRecipientResolver = [("u3", "")].into_iter().collect();
        let token = resolver.resolve("u3").await.unwrap();
        assert!(token.is_some_and(|t| t.is_blank()));
    }
}
