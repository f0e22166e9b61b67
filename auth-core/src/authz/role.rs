use std::sync::Arc;
use uuid::Uuid;

use crate::models::{AuthorizationRequest, Credential, Role, ScopeLevel};
use crate::services::error::AuthError;
use crate::store::{CredentialStore, StoreError};

/// Role-hierarchy authorization over store-owned scope assignments.
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn CredentialStore>,
    enable_application_admin: bool,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn CredentialStore>, enable_application_admin: bool) -> Self {
        Self {
            store,
            enable_application_admin,
        }
    }

    pub async fn is_authorized(
        &self,
        credential: &Credential,
        request: &AuthorizationRequest,
    ) -> Result<bool, AuthError> {
        let account_id = credential.account_id();

        if self.enable_application_admin && self.is_application_admin(account_id).await? {
            tracing::debug!(account_id = %account_id, "Application admin bypass");
            return Ok(true);
        }

        let required = request.authorization_type.required_role();
        match request.authorization_type.level() {
            ScopeLevel::Application => {
                if self.enable_application_admin {
                    Ok(false)
                } else {
                    Err(AuthError::ApplicationAdminDisabled)
                }
            }
            ScopeLevel::Workspace => {
                let workspace_id = request
                    .workspace_id
                    .ok_or(AuthError::MissingScope("workspace"))?;
                match self.store.workspace_role(account_id, workspace_id).await {
                    Ok(role) => Ok(role.satisfies(required)),
                    Err(StoreError::NotFound) => Ok(false),
                    Err(source) => Err(AuthError::ScopeLookup {
                        scope: "workspace",
                        source,
                    }),
                }
            }
            ScopeLevel::Repository => {
                let repository_id = request
                    .repository_id
                    .ok_or(AuthError::MissingScope("repository"))?;
                match self.store.repository_role(account_id, repository_id).await {
                    Ok(role) => Ok(role.satisfies(required)),
                    Err(StoreError::NotFound) => {
                        self.workspace_fallback(account_id, request.workspace_id, required)
                            .await
                    }
                    Err(source) => Err(AuthError::ScopeLookup {
                        scope: "repository",
                        source,
                    }),
                }
            }
        }
    }

    /// Repository without an explicit assignment: the workspace role decides.
    async fn workspace_fallback(
        &self,
        account_id: Uuid,
        workspace_id: Option<Uuid>,
        required: Role,
    ) -> Result<bool, AuthError> {
        let workspace_id = workspace_id.ok_or(AuthError::MissingScope("workspace"))?;

        match self.store.workspace_role(account_id, workspace_id).await {
            Ok(role) => Ok(role.satisfies(required)),
            Err(StoreError::NotFound) => Ok(false),
            Err(source) => {
                tracing::error!(
                    account_id = %account_id,
                    workspace_id = %workspace_id,
                    error = %source,
                    "authz: workspace fallback lookup failed"
                );
                Err(AuthError::WorkspaceFallback {
                    repository_cause: StoreError::NotFound,
                    source,
                })
            }
        }
    }

    async fn is_application_admin(&self, account_id: Uuid) -> Result<bool, AuthError> {
        match self.store.find_account_by_id(account_id).await {
            Ok(account) => Ok(account.is_application_admin),
            Err(StoreError::NotFound) => Ok(false),
            Err(e) => Err(AuthError::Store(e)),
        }
    }
}
