//! Authorization request types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Identity provider backing the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Accounts and passwords kept in the credential store.
    Horusec,
    /// Directory service with bind/search semantics.
    Ldap,
    /// Third-party OpenID Connect identity provider.
    Keycloak,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Horusec => "horusec",
            AuthType::Ldap => "ldap",
            AuthType::Keycloak => "keycloak",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horusec" => Ok(AuthType::Horusec),
            "ldap" => Ok(AuthType::Ldap),
            "keycloak" => Ok(AuthType::Keycloak),
            _ => Err(format!("Invalid auth type: {}", s)),
        }
    }
}

/// Kind of access being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationType {
    ApplicationAdmin,
    WorkspaceAdmin,
    WorkspaceMember,
    RepositoryAdmin,
    RepositorySupervisor,
    RepositoryMember,
}

/// Granularity an authorization type applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeLevel {
    Application,
    Workspace,
    Repository,
}

impl AuthorizationType {
    pub fn level(&self) -> ScopeLevel {
        match self {
            AuthorizationType::ApplicationAdmin => ScopeLevel::Application,
            AuthorizationType::WorkspaceAdmin | AuthorizationType::WorkspaceMember => {
                ScopeLevel::Workspace
            }
            AuthorizationType::RepositoryAdmin
            | AuthorizationType::RepositorySupervisor
            | AuthorizationType::RepositoryMember => ScopeLevel::Repository,
        }
    }

    /// Minimum scope role the type demands.
    pub fn required_role(&self) -> Role {
        match self {
            AuthorizationType::ApplicationAdmin
            | AuthorizationType::WorkspaceAdmin
            | AuthorizationType::RepositoryAdmin => Role::Admin,
            AuthorizationType::RepositorySupervisor => Role::Supervisor,
            AuthorizationType::WorkspaceMember | AuthorizationType::RepositoryMember => {
                Role::Member
            }
        }
    }
}

/// Input of an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// Bearer credential of the caller.
    pub token: String,
    pub authorization_type: AuthorizationType,
    pub workspace_id: Option<Uuid>,
    pub repository_id: Option<Uuid>,
}

impl AuthorizationRequest {
    pub fn new(token: impl Into<String>, authorization_type: AuthorizationType) -> Self {
        Self {
            token: token.into(),
            authorization_type,
            workspace_id: None,
            repository_id: None,
        }
    }

    pub fn with_workspace(mut self, workspace_id: Uuid) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    pub fn with_repository(mut self, repository_id: Uuid) -> Self {
        self.repository_id = Some(repository_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_type_parsing_is_case_insensitive() {
        assert_eq!("Keycloak".parse::<AuthType>().unwrap(), AuthType::Keycloak);
        assert_eq!(" ldap ".parse::<AuthType>().unwrap(), AuthType::Ldap);
        assert!("oauth".parse::<AuthType>().is_err());
    }

    #[test]
    fn test_required_roles() {
        assert_eq!(AuthorizationType::RepositorySupervisor.required_role(), Role::Supervisor);
        assert_eq!(AuthorizationType::WorkspaceMember.required_role(), Role::Member);
        assert_eq!(AuthorizationType::RepositoryAdmin.level(), ScopeLevel::Repository);
    }
}
