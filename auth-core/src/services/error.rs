use service_core::error::AppError;
use thiserror::Error;

use super::cache::CacheError;
use super::policy::PolicyError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found in directory")]
    UserNotFound,

    #[error("Directory search returned more than one entry")]
    TooManyEntries,

    #[error("Account email not confirmed")]
    AccountNotConfirmed,

    #[error("Invalid or unsupported auth type")]
    AuthTypeInvalid,

    #[error("Application admin is disabled")]
    ApplicationAdminDisabled,

    #[error("Application admin group is not set")]
    AdminGroupNotSet,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Missing {0} id")]
    MissingScope(&'static str),

    #[error(transparent)]
    PasswordPolicy(#[from] PolicyError),

    #[error("Failed to look up {scope} authorization: {source}")]
    ScopeLookup {
        scope: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Workspace fallback failed after repository lookup ({repository_cause}): {source}")]
    WorkspaceFallback {
        repository_cause: StoreError,
        #[source]
        source: StoreError,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Outcomes a caller must not be able to tell apart.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::AccountNotConfirmed
                | AuthError::UserNotFound
                | AuthError::TooManyEntries
                | AuthError::Unauthorized
        )
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        if err.is_credential_failure() {
            tracing::debug!(reason = %err, "Authentication rejected");
            return AppError::Forbidden(anyhow::anyhow!("Invalid username or password"));
        }

        match err {
            AuthError::InvalidToken | AuthError::InvalidOrExpiredToken => {
                AppError::Unauthorized(anyhow::anyhow!(err.to_string()))
            }
            AuthError::ApplicationAdminDisabled => {
                AppError::Forbidden(anyhow::anyhow!(err.to_string()))
            }
            AuthError::AuthTypeInvalid | AuthError::AdminGroupNotSet => {
                AppError::ConfigError(anyhow::anyhow!(err.to_string()))
            }
            AuthError::MissingScope(_) | AuthError::PasswordPolicy(_) => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            AuthError::Store(StoreError::NotFound) => {
                AppError::NotFound(anyhow::anyhow!("Record not found"))
            }
            AuthError::Store(_) | AuthError::ScopeLookup { .. } | AuthError::WorkspaceFallback { .. } => {
                AppError::DatabaseError(anyhow::Error::new(err))
            }
            AuthError::Cache(e) => AppError::CacheError(anyhow::Error::new(e)),
            AuthError::Internal(e) => AppError::InternalError(e),
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}
