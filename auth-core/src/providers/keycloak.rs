//! External IdP provider backed by Keycloak over OpenID Connect.
//!
//! Password checks are delegated to the IdP. Accounts, roles and issued
//! credentials stay local.

use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::IdentityProvider;
use crate::authz::RoleResolver;
use crate::config::KeycloakConfig;
use crate::models::{AuthResponse, AuthType, AuthorizationRequest, Credential};
use crate::services::error::AuthError;
use crate::services::session::SessionIssuer;
use crate::store::{CredentialStore, StoreError};

#[derive(Error, Debug)]
pub enum IdpError {
    #[error("Identity provider rejected the request with status {0}")]
    Rejected(u16),

    #[error("Identity provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid identity provider response: {0}")]
    InvalidResponse(String),
}

/// Tokens granted by the IdP for a password login.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
}

/// Who an IdP access token belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalIdentity {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

#[async_trait]
pub trait ExternalIdentityClient: Send + Sync {
    async fn verify_password(&self, username: &str, password: &str) -> Result<ExternalToken, IdpError>;

    async fn resolve_identity(&self, access_token: &str) -> Result<ExternalIdentity, IdpError>;
}

/// OpenID Connect client for a Keycloak realm.
#[derive(Clone)]
pub struct KeycloakClient {
    http: reqwest::Client,
    config: KeycloakConfig,
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> Result<Self, IdpError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, name: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.config.base_path.trim_end_matches('/'),
            self.config.realm,
            name
        )
    }
}

#[async_trait]
impl ExternalIdentityClient for KeycloakClient {
    async fn verify_password(&self, username: &str, password: &str) -> Result<ExternalToken, IdpError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("username", username),
                ("password", password),
                ("scope", "openid"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(status = %status, "keycloak: token request rejected");
            return Err(IdpError::Rejected(status.as_u16()));
        }

        Ok(response.json::<ExternalToken>().await?)
    }

    async fn resolve_identity(&self, access_token: &str) -> Result<ExternalIdentity, IdpError> {
        let response = self
            .http
            .get(self.endpoint("userinfo"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::debug!(status = %status, "keycloak: userinfo request rejected");
            return Err(IdpError::Rejected(status.as_u16()));
        }

        Ok(response.json::<ExternalIdentity>().await?)
    }
}

#[derive(Clone)]
pub struct KeycloakProvider {
    store: Arc<dyn CredentialStore>,
    sessions: SessionIssuer,
    resolver: RoleResolver,
    idp: Arc<dyn ExternalIdentityClient>,
    timeout: Duration,
}

impl KeycloakProvider {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        sessions: SessionIssuer,
        idp: Arc<dyn ExternalIdentityClient>,
        config: &KeycloakConfig,
        enable_application_admin: bool,
    ) -> Self {
        let resolver = RoleResolver::new(store.clone(), enable_application_admin);
        Self {
            store,
            sessions,
            resolver,
            idp,
            timeout: config.timeout(),
        }
    }

    async fn call<T, F>(&self, step: &'static str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, IdpError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!(step, error = %e, "keycloak: identity provider call failed");
                None
            }
            Err(_) => {
                tracing::warn!(step, "keycloak: identity provider call timed out");
                None
            }
        }
    }

    /// Map an IdP access token to the local account it belongs to.
    async fn resolve_external(&self, token: &str) -> Result<Credential, AuthError> {
        let identity = self
            .call("userinfo", self.idp.resolve_identity(token))
            .await
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let email = identity
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let account = match self.store.find_account_by_email(&email).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                tracing::info!(subject = %identity.sub, "keycloak: no local account for identity");
                return Err(AuthError::InvalidOrExpiredToken);
            }
            Err(e) => return Err(AuthError::Store(e)),
        };

        let jwt = self.sessions.jwt();
        Ok(jwt.mint(&account.profile(), Vec::new(), jwt.access_token_ttl()))
    }
}

#[async_trait]
impl IdentityProvider for KeycloakProvider {
    fn auth_type(&self) -> AuthType {
        AuthType::Keycloak
    }

    async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let account = match self.store.find_account_by_email(identifier).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                tracing::info!("Login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::Store(e)),
        };

        self.call("token", self.idp.verify_password(identifier, password))
            .await
            .ok_or(AuthError::InvalidCredentials)?;

        let response = self.sessions.issue(&account.profile(), Vec::new()).await?;
        tracing::info!(account_id = %account.account_id, "Login successful");
        Ok(response)
    }

    async fn is_authorized(&self, request: &AuthorizationRequest) -> Result<bool, AuthError> {
        let credential = self.resolve_token(&request.token).await?;
        self.resolver.is_authorized(&credential, request).await
    }

    /// Credentials signed here are decoded locally and never forwarded to the IdP.
    async fn resolve_token(&self, token: &str) -> Result<Credential, AuthError> {
        let jwt = self.sessions.jwt();
        if jwt.is_local(token) {
            return jwt.decode(token);
        }
        self.resolve_external(token).await
    }
}
