//! Bearer tokens for the prediction provider. A fresh token is exchanged from
//! the service-account key on every call; nothing is cached between requests.

use crate::constants::CLOUD_PLATFORM_SCOPE;
use async_trait::async_trait;
use google_cloud_auth::credentials::service_account::{AccessSpecifier, Builder};
use google_cloud_auth::credentials::CacheableResource;
use http::header::AUTHORIZATION;
use http::Extensions;
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to load service account key {path}: {reason}")]
    KeyFile { path: PathBuf, reason: String },

    #[error("invalid service account credentials: {0}")]
    Credentials(String),

    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("identity provider returned no bearer token")]
    MissingToken,
}

/// A short-lived OAuth access token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        AccessToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken(<redacted>)")
    }
}

/// Anything that can hand out a bearer token for the prediction provider
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, AuthError>;
}

/// Exchanges a service-account key file for a cloud-platform scoped token
#[derive(Debug, Clone)]
pub struct ServiceAccountTokens {
    key_path: PathBuf,
}

impl ServiceAccountTokens {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        ServiceAccountTokens {
            key_path: key_path.into(),
        }
    }

    async fn load_key(&self) -> Result<serde_json::Value, AuthError> {
        let key_error = |reason: String| AuthError::KeyFile {
            path: self.key_path.clone(),
            reason,
        };
        let content = tokio::fs::read_to_string(&self.key_path)
            .await
            .map_err(|err| key_error(err.to_string()))?;
        let key: serde_json::Value =
            serde_json::from_str(&content).map_err(|err| key_error(err.to_string()))?;
        if !key.is_object() {
            return Err(key_error("expected a JSON object".into()));
        }
        Ok(key)
    }

    /// One token exchange, no retries
    async fn refresh(&self) -> Result<AccessToken, AuthError> {
        let key = self.load_key().await?;
        let credentials = Builder::new(key)
            .with_access_specifier(AccessSpecifier::from_scopes([CLOUD_PLATFORM_SCOPE]))
            .build()
            .map_err(|err| AuthError::Credentials(err.to_string()))?;

        let headers = match credentials
            .headers(Extensions::new())
            .await
            .map_err(|err| AuthError::Refresh(err.to_string()))?
        {
            CacheableResource::New { data, .. } => data,
            CacheableResource::NotModified => return Err(AuthError::MissingToken),
        };

        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_value)
            .ok_or(AuthError::MissingToken)?;
        Ok(AccessToken::new(token))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<AccessToken, AuthError> {
        let token = self.refresh().await?;
        debug!("obtained access token for {}", self.key_path.display());
        Ok(token)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
fn bearer_value(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
