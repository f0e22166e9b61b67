use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::models::{Account, AuthzGroupSet, Role, Scope, ScopeRoleAssignment};

/// In-process credential store for local development and tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: DashMap<Uuid, Account>,
    workspace_roles: DashMap<(Uuid, Uuid), Role>,
    repository_roles: DashMap<(Uuid, Uuid), Role>,
    workspace_groups: DashMap<Uuid, AuthzGroupSet>,
    repository_groups: DashMap<Uuid, AuthzGroupSet>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account without uniqueness checks.
    pub fn put_account(&self, account: Account) {
        self.accounts.insert(account.account_id, account);
    }

    pub fn assign(&self, assignment: ScopeRoleAssignment) {
        match assignment.scope {
            Scope::Workspace(workspace_id) => {
                self.workspace_roles
                    .insert((assignment.account_id, workspace_id), assignment.role);
            }
            Scope::Repository { repository_id, .. } => {
                self.repository_roles
                    .insert((assignment.account_id, repository_id), assignment.role);
            }
        }
    }

    pub fn set_workspace_groups(&self, workspace_id: Uuid, groups: AuthzGroupSet) {
        self.workspace_groups.insert(workspace_id, groups);
    }

    pub fn set_repository_groups(&self, repository_id: Uuid, groups: AuthzGroupSet) {
        self.repository_groups.insert(repository_id, groups);
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn find_account<P>(&self, predicate: P) -> Result<Account, StoreError>
    where
        P: Fn(&Account) -> bool,
    {
        self.accounts
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Account, StoreError> {
        self.accounts
            .get(&account_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.find_account(|account| account.email.eq_ignore_ascii_case(email))
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Account, StoreError> {
        self.find_account(|account| account.username == username)
    }

    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let duplicate = self.accounts.iter().any(|entry| {
            let existing = entry.value();
            existing.account_id == account.account_id
                || existing.email.eq_ignore_ascii_case(&account.email)
                || existing.username == account.username
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "account {} already exists",
                account.username
            )));
        }

        self.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn update_password(
        &self,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::NotFound)?;
        account.password = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn workspace_role(
        &self,
        account_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Role, StoreError> {
        self.workspace_roles
            .get(&(account_id, workspace_id))
            .map(|role| *role)
            .ok_or(StoreError::NotFound)
    }

    async fn repository_role(
        &self,
        account_id: Uuid,
        repository_id: Uuid,
    ) -> Result<Role, StoreError> {
        self.repository_roles
            .get(&(account_id, repository_id))
            .map(|role| *role)
            .ok_or(StoreError::NotFound)
    }

    async fn workspace_groups(&self, workspace_id: Uuid) -> Result<AuthzGroupSet, StoreError> {
        self.workspace_groups
            .get(&workspace_id)
            .map(|groups| groups.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn repository_groups(&self, repository_id: Uuid) -> Result<AuthzGroupSet, StoreError> {
        self.repository_groups
            .get(&repository_id)
            .map(|groups| groups.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str, username: &str) -> Account {
        Account::new(email.to_string(), username.to_string(), "hash".to_string())
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let store = MemoryCredentialStore::new();
        let created = account("User@X.com", "user");
        store.create_account(&created).await.unwrap();

        let found = store.find_account_by_email("user@x.com").await.unwrap();
        assert_eq!(found.account_id, created.account_id);
    }

    #[tokio::test]
    async fn test_duplicate_accounts_conflict() {
        let store = MemoryCredentialStore::new();
        store.create_account(&account("a@x.com", "a")).await.unwrap();

        let result = store.create_account(&account("A@x.com", "b")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_missing_role_is_not_found() {
        let store = MemoryCredentialStore::new();
        let result = store.workspace_role(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_assignments_are_scoped() {
        let store = MemoryCredentialStore::new();
        let (account_id, workspace_id, repository_id) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.assign(ScopeRoleAssignment::repository(
            account_id,
            workspace_id,
            repository_id,
            Role::Supervisor,
        ));

        assert_eq!(
            store.repository_role(account_id, repository_id).await.unwrap(),
            Role::Supervisor
        );
        assert!(store.workspace_role(account_id, workspace_id).await.is_err());
    }
}
