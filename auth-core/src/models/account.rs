//! Account model - platform identities owned by the credential store.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Account entity.
///
/// `password` holds an Argon2 PHC string, never the cleartext password.
#[derive(Clone, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub email: String,
    pub username: String,
    pub password: String,
    pub is_confirmed: bool,
    pub is_application_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new, unconfirmed account from an already hashed password.
    pub fn new(email: String, username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            account_id: Uuid::new_v4(),
            email,
            username,
            password: password_hash,
            is_confirmed: false,
            is_application_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn confirmed(mut self) -> Self {
        self.is_confirmed = true;
        self
    }

    pub fn application_admin(mut self) -> Self {
        self.is_application_admin = true;
        self
    }

    /// Profile data carried by issued credentials.
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            account_id: self.account_id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_application_admin: self.is_application_admin,
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("is_confirmed", &self.is_confirmed)
            .field("is_application_admin", &self.is_application_admin)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Public part of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProfile {
    pub account_id: Uuid,
    pub username: String,
    pub email: String,
    pub is_application_admin: bool,
}
