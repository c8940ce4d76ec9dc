//! OAuth token boundary
//!
//! Token acquisition and refresh live outside this crate. The dispatcher only
//! asks a [`TokenProvider`] for an application token or a user token by
//! credential identifier, and wraps any failure in the library error.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;

/// OAuth grant type an operation requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuthFlow {
    /// Application token (client credentials grant)
    #[serde(rename = "clientCredentials")]
    ClientCredentials,
    /// User token (authorization code grant)
    #[serde(rename = "authorizationCode")]
    AuthorizationCode,
}

impl AuthFlow {
    /// Name used in OpenAPI security scheme declarations
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFlow::ClientCredentials => "clientCredentials",
            AuthFlow::AuthorizationCode => "authorizationCode",
        }
    }

    pub fn from_openapi(name: &str) -> Option<Self> {
        match name {
            "clientCredentials" => Some(AuthFlow::ClientCredentials),
            "authorizationCode" => Some(AuthFlow::AuthorizationCode),
            _ => None,
        }
    }
}

impl fmt::Display for AuthFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a token provider
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential not configured: {0}")]
    NotConfigured(String),

    #[error("Credential rejected: {0}")]
    Rejected(String),

    #[error("Token service unavailable: {0}")]
    Unavailable(String),
}

/// Source of OAuth access tokens
///
/// Implementations are expected to cache and refresh tokens themselves and
/// to be safe to call from many tasks at once.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Token for the client credentials grant
    async fn get_application_token(&self, credential_id: &str) -> Result<String, CredentialError>;

    /// Token for the authorization code grant, bound to a user credential
    async fn get_user_token(&self, credential_id: &str) -> Result<String, CredentialError>;
}

/// Provider backed by fixed tokens
///
/// Useful for short-lived scripts that already hold tokens, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    application: HashMap<String, String>,
    user: HashMap<String, String>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_application_token(mut self, credential_id: &str, token: &str) -> Self {
        self.application.insert(credential_id.to_string(), token.to_string());
        self
    }

    pub fn with_user_token(mut self, credential_id: &str, token: &str) -> Self {
        self.user.insert(credential_id.to_string(), token.to_string());
        self
    }

    /// Build from the `[credentials]` settings section
    pub fn from_settings(settings: &Settings) -> Self {
        let mut provider = Self::new();
        if let Some(token) = &settings.credentials.application_token {
            provider = provider.with_application_token(&settings.api.application_credential_id, token);
        }
        if let (Some(user_id), Some(token)) =
            (&settings.api.user_credential_id, &settings.credentials.user_token)
        {
            provider = provider.with_user_token(user_id, token);
        }
        provider
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_application_token(&self, credential_id: &str) -> Result<String, CredentialError> {
        self.application
            .get(credential_id)
            .cloned()
            .ok_or_else(|| CredentialError::NotConfigured(credential_id.to_string()))
    }

    async fn get_user_token(&self, credential_id: &str) -> Result<String, CredentialError> {
        self.user
            .get(credential_id)
            .cloned()
            .ok_or_else(|| CredentialError::NotConfigured(credential_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_names() {
        assert_eq!(AuthFlow::from_openapi("clientCredentials"), Some(AuthFlow::ClientCredentials));
        assert_eq!(AuthFlow::from_openapi("authorizationCode"), Some(AuthFlow::AuthorizationCode));
        assert_eq!(AuthFlow::from_openapi("implicit"), None);
        assert_eq!(AuthFlow::AuthorizationCode.to_string(), "authorizationCode");
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTokenProvider::new()
            .with_application_token("app", "v^1.1#app")
            .with_user_token("seller", "v^1.1#user");

        assert_eq!(provider.get_application_token("app").await.unwrap(), "v^1.1#app");
        assert_eq!(provider.get_user_token("seller").await.unwrap(), "v^1.1#user");
        assert!(matches!(
            provider.get_user_token("app").await,
            Err(CredentialError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.api.application_credential_id = "app".to_string();
        settings.api.user_credential_id = Some("seller".to_string());
        settings.credentials.application_token = Some("t1".to_string());
        settings.credentials.user_token = Some("t2".to_string());

        let provider = StaticTokenProvider::from_settings(&settings);
        assert_eq!(tokio_test::block_on(provider.get_application_token("app")).unwrap(), "t1");
        assert_eq!(tokio_test::block_on(provider.get_user_token("seller")).unwrap(), "t2");
    }
}
