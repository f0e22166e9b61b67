//! Bearer credential and session payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AccountProfile;

/// Claims of a signed bearer credential. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Subject (account ID)
    pub sub: Uuid,
    pub username: String,
    pub email: String,
    pub is_application_admin: bool,
    /// Permission group names, in the order the provider reported them
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Credential {
    pub fn account_id(&self) -> Uuid {
        self.sub
    }

    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            account_id: self.sub,
            username: self.username.clone(),
            email: self.email.clone(),
            is_application_admin: self.is_application_admin,
        }
    }
}

/// Value stored in the ephemeral cache under a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEntry {
    pub account_id: Uuid,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiration of the access token (Unix timestamp)
    pub expires_at: i64,
    pub username: String,
    pub email: String,
    pub is_application_admin: bool,
}
