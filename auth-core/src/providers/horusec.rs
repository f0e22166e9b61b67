//! Local provider: accounts and Argon2 password hashes in the credential store.

use async_trait::async_trait;
use std::sync::Arc;
use validator::ValidateEmail;

use super::IdentityProvider;
use crate::authz::RoleResolver;
use crate::models::{AuthResponse, AuthType, AuthorizationRequest, Credential};
use crate::services::error::AuthError;
use crate::services::session::SessionIssuer;
use crate::store::{CredentialStore, StoreError};
use crate::utils::{verify_password, Password, PasswordHashString};

#[derive(Clone)]
pub struct HorusecProvider {
    store: Arc<dyn CredentialStore>,
    sessions: SessionIssuer,
    resolver: RoleResolver,
}

impl HorusecProvider {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        sessions: SessionIssuer,
        enable_application_admin: bool,
    ) -> Self {
        let resolver = RoleResolver::new(store.clone(), enable_application_admin);
        Self {
            store,
            sessions,
            resolver,
        }
    }
}

#[async_trait]
impl IdentityProvider for HorusecProvider {
    fn auth_type(&self) -> AuthType {
        AuthType::Horusec
    }

    async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse, AuthError> {
        if !identifier.validate_email() {
            return Err(AuthError::InvalidCredentials);
        }

        let account = match self.store.find_account_by_email(identifier).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                tracing::info!("Login failed: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::Store(e)),
        };

        let hash = PasswordHashString::new(account.password.clone());
        if verify_password(&Password::new(password), &hash).is_err() {
            tracing::info!(account_id = %account.account_id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_confirmed {
            tracing::info!(account_id = %account.account_id, "Login failed: account not confirmed");
            return Err(AuthError::AccountNotConfirmed);
        }

        let response = self.sessions.issue(&account.profile(), Vec::new()).await?;
        tracing::info!(account_id = %account.account_id, "Login successful");
        Ok(response)
    }

    async fn is_authorized(&self, request: &AuthorizationRequest) -> Result<bool, AuthError> {
        let credential = self.sessions.jwt().decode(&request.token)?;
        self.resolver.is_authorized(&credential, request).await
    }

    async fn resolve_token(&self, token: &str) -> Result<Credential, AuthError> {
        self.sessions.jwt().decode(token)
    }
}
