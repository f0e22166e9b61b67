//! Authentication controller.
//!
//! Holds the provider chosen at startup and forwards every call to it.

use std::sync::Arc;

use crate::models::{AuthResponse, AuthType, AuthorizationRequest, Credential};
use crate::providers::IdentityProvider;
use crate::services::error::AuthError;

/// Providers available to the controller, one slot per auth type.
#[derive(Clone, Default)]
pub struct ProviderSet {
    pub horusec: Option<Arc<dyn IdentityProvider>>,
    pub ldap: Option<Arc<dyn IdentityProvider>>,
    pub keycloak: Option<Arc<dyn IdentityProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a provider in the slot matching its auth type.
    pub fn with(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        match provider.auth_type() {
            AuthType::Horusec => self.horusec = Some(provider),
            AuthType::Ldap => self.ldap = Some(provider),
            AuthType::Keycloak => self.keycloak = Some(provider),
        }
        self
    }

    fn take(self, auth_type: AuthType) -> Option<Arc<dyn IdentityProvider>> {
        match auth_type {
            AuthType::Horusec => self.horusec,
            AuthType::Ldap => self.ldap,
            AuthType::Keycloak => self.keycloak,
        }
    }
}

#[derive(Clone)]
pub struct AuthController {
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl AuthController {
    pub fn new(auth_type: AuthType, providers: ProviderSet) -> Self {
        let provider = providers
            .take(auth_type)
            .filter(|provider| provider.auth_type() == auth_type);

        if provider.is_none() {
            tracing::error!(auth_type = %auth_type, "No identity provider registered for auth type");
        }

        Self { provider }
    }

    /// Build from a raw auth type name. Unknown names yield a controller that rejects every call.
    pub fn from_name(auth_type: &str, providers: ProviderSet) -> Self {
        match auth_type.parse::<AuthType>() {
            Ok(auth_type) => Self::new(auth_type, providers),
            Err(e) => {
                tracing::error!(error = %e, "Unknown auth type");
                Self { provider: None }
            }
        }
    }

    pub fn auth_type(&self) -> Option<AuthType> {
        self.provider.as_ref().map(|provider| provider.auth_type())
    }

    fn provider(&self) -> Result<&Arc<dyn IdentityProvider>, AuthError> {
        self.provider.as_ref().ok_or(AuthError::AuthTypeInvalid)
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse, AuthError> {
        self.provider()?.login(identifier, password).await
    }

    pub async fn is_authorized(&self, request: &AuthorizationRequest) -> Result<bool, AuthError> {
        self.provider()?.is_authorized(request).await
    }

    pub async fn resolve_token(&self, token: &str) -> Result<Credential, AuthError> {
        self.provider()?.resolve_token(token).await
    }
}
