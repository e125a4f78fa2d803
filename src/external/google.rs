//! Google service-account credentials for the FCM HTTP v1 API.
//!
//! A signed RS256 assertion is exchanged for an OAuth2 access token using the
//! JWT bearer grant. Refresh policy lives in the credential cache; this
//! module performs one exchange per call.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::push::{BearerCredential, CredentialError, CredentialSource};

pub const FIREBASE_MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: SignedDuration = SignedDuration::from_hours(1);

/// Provider endpoint for sending one message in `project_id`
pub fn fcm_endpoint(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/v1/projects/{}/messages:send",
        base_url.trim_end_matches('/'),
        project_id
    )
}

#[derive(Debug, Error)]
pub enum ServiceAccountError {
    #[error("Failed to read service account file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid service account JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid service account private key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

/// The fields of a downloaded service-account key file that the token
/// exchange needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ServiceAccountError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ServiceAccountError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ServiceAccountError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    token_type: Option<String>,
}

/// [`CredentialSource`] backed by a service-account key.
pub struct ServiceAccountSource {
    client: reqwest::Client,
    client_email: String,
    key_id: String,
    signing_key: EncodingKey,
    token_uri: String,
    scope: String,
}

impl ServiceAccountSource {
    /// Parses the private key up front so a bad key fails at startup.
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self, ServiceAccountError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        Ok(Self {
            client,
            client_email: key.client_email,
            key_id: key.private_key_id,
            signing_key,
            token_uri: key.token_uri,
            scope: FIREBASE_MESSAGING_SCOPE.to_string(),
        })
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    fn assertion(&self, now: Timestamp) -> Result<String, CredentialError> {
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat: now.as_second(),
            exp: (now + ASSERTION_LIFETIME).as_second(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());

        encode(&header, &claims, &self.signing_key)
            .map_err(|e| CredentialError::InvalidToken(format!("failed to sign assertion: {e}")))
    }
}

#[async_trait]
impl CredentialSource for ServiceAccountSource {
    async fn refresh(&self) -> Result<BearerCredential, CredentialError> {
        let now = Timestamp::now();
        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CredentialError::Unreachable(e.to_string()))?;

        if status.is_server_error() {
            return Err(CredentialError::Unreachable(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            return Err(CredentialError::Rejected(format!("{status}: {body}")));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CredentialError::InvalidToken(format!("malformed token response: {e}")))?;
        if let Some(ref kind) = token.token_type
            && !kind.eq_ignore_ascii_case("bearer")
        {
            return Err(CredentialError::InvalidToken(format!(
                "unexpected token type {kind}"
            )));
        }

        let expires_at = now
            .checked_add(SignedDuration::from_secs(token.expires_in))
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))?;
        Ok(BearerCredential::new(token.access_token, expires_at))
    }

    fn name(&self) -> &'static str {
        "service_account"
    }
}
