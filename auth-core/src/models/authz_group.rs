//! Directory group names attached to workspaces and repositories.

use serde::{Deserialize, Serialize};

use super::Role;

/// Group names granting each tier on a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzGroupSet {
    #[serde(default)]
    pub admin: Vec<String>,
    #[serde(default)]
    pub supervisor: Vec<String>,
    #[serde(default)]
    pub member: Vec<String>,
}

impl AuthzGroupSet {
    pub fn new(admin: Vec<String>, supervisor: Vec<String>, member: Vec<String>) -> Self {
        Self {
            admin,
            supervisor,
            member,
        }
    }

    pub fn tier(&self, role: Role) -> &[String] {
        match role {
            Role::Admin => &self.admin,
            Role::Supervisor => &self.supervisor,
            Role::Member => &self.member,
        }
    }

    /// Effective set of a child scope: each empty tier takes the parent's tier.
    pub fn inherit_from(&self, parent: &AuthzGroupSet) -> AuthzGroupSet {
        fn pick(own: &[String], parent: &[String]) -> Vec<String> {
            if own.is_empty() {
                parent.to_vec()
            } else {
                own.to_vec()
            }
        }

        AuthzGroupSet {
            admin: pick(&self.admin, &parent.admin),
            supervisor: pick(&self.supervisor, &parent.supervisor),
            member: pick(&self.member, &parent.member),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_empty_tiers_inherit_parent() {
        let workspace = AuthzGroupSet::new(names(&["ops"]), names(&["leads"]), names(&["devs"]));
        let repository = AuthzGroupSet::new(vec![], names(&["repo-leads"]), vec![]);

        let effective = repository.inherit_from(&workspace);
        assert_eq!(effective.admin, names(&["ops"]));
        assert_eq!(effective.supervisor, names(&["repo-leads"]));
        assert_eq!(effective.member, names(&["devs"]));
    }

    #[test]
    fn test_tier_lookup() {
        let set = AuthzGroupSet::new(names(&["a"]), names(&["s"]), names(&["m"]));
        assert_eq!(set.tier(Role::Admin), names(&["a"]).as_slice());
        assert_eq!(set.tier(Role::Member), names(&["m"]).as_slice());
    }
}
