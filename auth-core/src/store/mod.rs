//! Credential store boundary.
//!
//! Accounts, scope role assignments and directory group sets live in the
//! platform database. The core only needs lookups plus the two writes login
//! and password change perform.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, AuthzGroupSet, Role};

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Backend(anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Account, StoreError>;

    /// Case-insensitive email lookup.
    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError>;

    async fn find_account_by_username(&self, username: &str) -> Result<Account, StoreError>;

    /// Insert an account; email or username collisions fail with `Conflict`.
    async fn create_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn update_password(&self, account_id: Uuid, password_hash: &str)
        -> Result<(), StoreError>;

    async fn workspace_role(&self, account_id: Uuid, workspace_id: Uuid)
        -> Result<Role, StoreError>;

    async fn repository_role(
        &self,
        account_id: Uuid,
        repository_id: Uuid,
    ) -> Result<Role, StoreError>;

    async fn workspace_groups(&self, workspace_id: Uuid) -> Result<AuthzGroupSet, StoreError>;

    async fn repository_groups(&self, repository_id: Uuid) -> Result<AuthzGroupSet, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
