//! Scope roles and the role hierarchy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of an account inside a workspace or repository.
///
/// Ordered `Member < Supervisor < Admin`; a higher role implies every lower one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Supervisor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Supervisor => "supervisor",
            Role::Admin => "admin",
        }
    }

    pub fn check_for_member(self) -> bool {
        matches!(self, Role::Member | Role::Supervisor | Role::Admin)
    }

    pub fn check_for_supervisor(self) -> bool {
        matches!(self, Role::Supervisor | Role::Admin)
    }

    pub fn check_for_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Whether this role satisfies a `required` tier.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Member => self.check_for_member(),
            Role::Supervisor => self.check_for_supervisor(),
            Role::Admin => self.check_for_admin(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "supervisor" => Ok(Role::Supervisor),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Scope a role assignment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Workspace(Uuid),
    Repository { workspace_id: Uuid, repository_id: Uuid },
}

/// Role assignment of one account on one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRoleAssignment {
    pub account_id: Uuid,
    pub scope: Scope,
    pub role: Role,
}

impl ScopeRoleAssignment {
    pub fn workspace(account_id: Uuid, workspace_id: Uuid, role: Role) -> Self {
        Self {
            account_id,
            scope: Scope::Workspace(workspace_id),
            role,
        }
    }

    pub fn repository(
        account_id: Uuid,
        workspace_id: Uuid,
        repository_id: Uuid,
        role: Role,
    ) -> Self {
        Self {
            account_id,
            scope: Scope::Repository {
                workspace_id,
                repository_id,
            },
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Role; 3] = [Role::Member, Role::Supervisor, Role::Admin];

    #[test]
    fn test_member_check_accepts_every_role() {
        for role in ALL {
            assert!(role.check_for_member());
        }
    }

    #[test]
    fn test_supervisor_check() {
        assert!(!Role::Member.check_for_supervisor());
        assert!(Role::Supervisor.check_for_supervisor());
        assert!(Role::Admin.check_for_supervisor());
    }

    #[test]
    fn test_admin_check() {
        assert!(!Role::Member.check_for_admin());
        assert!(!Role::Supervisor.check_for_admin());
        assert!(Role::Admin.check_for_admin());
    }

    #[test]
    fn test_checks_are_monotonic_with_ordering() {
        for role in ALL {
            for required in ALL {
                assert_eq!(role.satisfies(required), role >= required);
            }
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Supervisor.to_string(), "supervisor");
        assert!("owner".parse::<Role>().is_err());
    }
}
