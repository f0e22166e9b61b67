//! Identity providers.
//!
//! Exactly one provider backs a running process, picked at startup from
//! `AUTH_TYPE`.

pub mod horusec;
pub mod keycloak;
pub mod ldap;

use async_trait::async_trait;

use crate::models::{AuthResponse, AuthType, AuthorizationRequest, Credential};
use crate::services::error::AuthError;

pub use horusec::HorusecProvider;
pub use keycloak::{ExternalIdentityClient, KeycloakClient, KeycloakProvider};
pub use ldap::{DirectoryClient, LdapDirectoryClient, LdapProvider};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn auth_type(&self) -> AuthType;

    /// Verify credentials and open a session.
    async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse, AuthError>;

    /// `Ok(false)` is a clean denial; errors mean no decision could be made.
    async fn is_authorized(&self, request: &AuthorizationRequest) -> Result<bool, AuthError>;

    /// Account data carried by a bearer token.
    async fn resolve_token(&self, token: &str) -> Result<Credential, AuthError>;
}
