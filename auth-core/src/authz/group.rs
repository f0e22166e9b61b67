use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{AuthorizationRequest, AuthorizationType, AuthzGroupSet, Credential, Role, ScopeLevel};
use crate::services::error::AuthError;
use crate::store::{CredentialStore, StoreError};

const TIERS: [Role; 3] = [Role::Admin, Role::Supervisor, Role::Member];

/// Group-claim authorization for directory-backed credentials.
///
/// The credential's `permissions` are matched against the group names
/// attached to the requested scope. Nothing about the caller is read
/// from the store.
#[derive(Clone)]
pub struct GroupResolver {
    store: Arc<dyn CredentialStore>,
    enable_application_admin: bool,
    admin_group: Option<String>,
}

impl GroupResolver {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        enable_application_admin: bool,
        admin_group: Option<String>,
    ) -> Self {
        Self {
            store,
            enable_application_admin,
            admin_group: admin_group
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty()),
        }
    }

    pub async fn is_authorized(
        &self,
        credential: &Credential,
        request: &AuthorizationRequest,
    ) -> Result<bool, AuthError> {
        if request.authorization_type == AuthorizationType::ApplicationAdmin {
            if !self.enable_application_admin {
                return Err(AuthError::ApplicationAdminDisabled);
            }
            let admin_group = self.admin_group.as_deref().ok_or(AuthError::AdminGroupNotSet)?;
            return Ok(intersects(&credential.permissions, [admin_group]));
        }

        // The admin group reaches every scope; the mode only gates `ApplicationAdmin`.
        let mut allowed: Vec<String> = self.admin_group.iter().cloned().collect();

        let required = request.authorization_type.required_role();
        match request.authorization_type.level() {
            ScopeLevel::Workspace => {
                let workspace_id = request
                    .workspace_id
                    .ok_or(AuthError::MissingScope("workspace"))?;
                match self.lookup("workspace", self.store.workspace_groups(workspace_id).await)? {
                    Some(groups) => allowed.extend(tiers_from(&groups, required)),
                    None => tracing::debug!(workspace_id = %workspace_id, "No groups for workspace"),
                }
            }
            ScopeLevel::Repository => {
                let repository_id = request
                    .repository_id
                    .ok_or(AuthError::MissingScope("repository"))?;
                let workspace_id = request
                    .workspace_id
                    .ok_or(AuthError::MissingScope("workspace"))?;

                let workspace =
                    self.lookup("workspace", self.store.workspace_groups(workspace_id).await)?;
                let repository =
                    self.lookup("repository", self.store.repository_groups(repository_id).await)?;

                let parent = workspace.unwrap_or_default();
                let effective = repository.unwrap_or_default().inherit_from(&parent);
                allowed.extend(tiers_from(&effective, required));
                allowed.extend(parent.admin);
            }
            ScopeLevel::Application => {}
        }

        Ok(intersects(&credential.permissions, allowed.iter().map(String::as_str)))
    }

    /// Missing group sets grant nothing; backend failures propagate.
    fn lookup(
        &self,
        scope: &'static str,
        result: Result<AuthzGroupSet, StoreError>,
    ) -> Result<Option<AuthzGroupSet>, AuthError> {
        match result {
            Ok(groups) => Ok(Some(groups)),
            Err(StoreError::NotFound) => Ok(None),
            Err(source) => Err(AuthError::ScopeLookup { scope, source }),
        }
    }
}

/// Every tier at or above `required`.
fn tiers_from(groups: &AuthzGroupSet, required: Role) -> Vec<String> {
    TIERS
        .iter()
        .filter(|tier| tier.satisfies(required))
        .flat_map(|tier| groups.tier(*tier).iter().cloned())
        .collect()
}

/// Trimmed, non-empty intersection test.
fn intersects<'a>(held: &[String], allowed: impl IntoIterator<Item = &'a str>) -> bool {
    let allowed: HashSet<&str> = allowed
        .into_iter()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .collect();

    held.iter()
        .map(|g| g.trim())
        .any(|g| !g.is_empty() && allowed.contains(g))
}
