//! Shared fixtures for auth-core integration tests.
//!
//! Everything runs in-process: memory store and cache, a scripted directory
//! and a scripted identity provider.

#![allow(dead_code)]

use async_trait::async_trait;
use auth_core::{
    config::AuthConfig,
    models::{Account, AuthType, AuthzGroupSet, Role},
    providers::keycloak::{ExternalIdentity, ExternalIdentityClient, ExternalToken, IdpError},
    providers::ldap::{DirectoryClient, DirectoryEntry, DirectoryError},
    services::{AuthService, MemoryCache, MockNotifier},
    store::{CredentialStore, MemoryCredentialStore, StoreError},
    utils::{hash_password, Password},
    AuthServiceBuilder,
};
use service_core::config::{Config, Environment};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const SERVICE_DN: &str = "cn=svc,dc=example,dc=com";
pub const SERVICE_PASSWORD: &str = "svc-pass";

/// Auth configuration for `auth_type` with test overrides applied.
pub fn test_config(auth_type: AuthType, overrides: &[(&str, &str)]) -> AuthConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("AUTH_TYPE".to_string(), auth_type.to_string()),
        ("DATABASE_URL".to_string(), "postgres://localhost/auth_test".to_string()),
        ("REDIS_URL".to_string(), "redis://localhost".to_string()),
        ("JWT_SECRET_KEY".to_string(), TEST_JWT_SECRET.to_string()),
        ("LDAP_HOST".to_string(), "ldap.example.com".to_string()),
        ("LDAP_BASE".to_string(), "dc=example,dc=com".to_string()),
        ("LDAP_BIND_DN".to_string(), SERVICE_DN.to_string()),
        ("LDAP_BIND_PASSWORD".to_string(), SERVICE_PASSWORD.to_string()),
        ("LDAP_TIMEOUT_SECONDS".to_string(), "1".to_string()),
        ("KEYCLOAK_BASE_PATH".to_string(), "http://127.0.0.1:1".to_string()),
        ("KEYCLOAK_CLIENT_ID".to_string(), "platform".to_string()),
        ("KEYCLOAK_CLIENT_SECRET".to_string(), "client-secret".to_string()),
        ("KEYCLOAK_REALM".to_string(), "main".to_string()),
        ("KEYCLOAK_TIMEOUT_SECONDS".to_string(), "1".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    let common = Config {
        environment: Environment::Dev,
        log_level: "debug".to_string(),
        otlp_endpoint: None,
    };
    AuthConfig::from_lookup(common, |key| vars.get(key).cloned())
        .expect("Failed to build test configuration")
}

/// Test application wired against in-memory backends.
pub struct TestApp {
    pub service: AuthService,
    pub store: Arc<MemoryCredentialStore>,
    pub cache: Arc<MemoryCache>,
    pub notifier: Arc<MockNotifier>,
    pub config: AuthConfig,
}

impl TestApp {
    pub fn spawn(auth_type: AuthType) -> Self {
        Self::builder(test_config(auth_type, &[])).build()
    }

    pub fn builder(config: AuthConfig) -> TestAppBuilder {
        TestAppBuilder {
            config,
            store: Arc::new(MemoryCredentialStore::new()),
            directory: None,
            idp: None,
            store_override: None,
        }
    }

    pub fn create_account(&self, email: &str, username: &str, password: &str, confirmed: bool) -> Account {
        let hash = hash_password(&Password::new(password)).expect("Failed to hash password");
        let mut account = Account::new(email.to_string(), username.to_string(), hash.into_string());
        if confirmed {
            account = account.confirmed();
        }
        self.store.put_account(account.clone());
        account
    }

    pub fn create_admin(&self, email: &str, username: &str, password: &str) -> Account {
        let account = self
            .create_account(email, username, password, true)
            .application_admin();
        self.store.put_account(account.clone());
        account
    }
}

pub struct TestAppBuilder {
    config: AuthConfig,
    store: Arc<MemoryCredentialStore>,
    directory: Option<Arc<dyn DirectoryClient>>,
    idp: Option<Arc<dyn ExternalIdentityClient>>,
    store_override: Option<Arc<dyn CredentialStore>>,
}

impl TestAppBuilder {
    pub fn memory_store(&self) -> Arc<MemoryCredentialStore> {
        self.store.clone()
    }

    pub fn directory(mut self, directory: Arc<dyn DirectoryClient>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn identity_client(mut self, idp: Arc<dyn ExternalIdentityClient>) -> Self {
        self.idp = Some(idp);
        self
    }

    /// Serve the service from a different store while keeping `TestApp::store` for setup.
    pub fn store_override(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store_override = Some(store);
        self
    }

    pub fn build(self) -> TestApp {
        let cache = Arc::new(MemoryCache::new());
        let notifier = Arc::new(MockNotifier::new());
        let store: Arc<dyn CredentialStore> = match self.store_override {
            Some(store) => store,
            None => self.store.clone(),
        };

        let mut builder = AuthServiceBuilder::new(self.config.clone())
            .store(store)
            .cache(cache.clone())
            .notifier(notifier.clone());
        if let Some(directory) = self.directory {
            builder = builder.directory(directory);
        }
        if let Some(idp) = self.idp {
            builder = builder.identity_client(idp);
        }

        TestApp {
            service: builder.build().expect("Failed to build auth service"),
            store: self.store,
            cache,
            notifier,
            config: self.config,
        }
    }
}

pub fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn groups(admin: &[&str], supervisor: &[&str], member: &[&str]) -> AuthzGroupSet {
    AuthzGroupSet::new(names(admin), names(supervisor), names(member))
}

/// Directory double keyed by the exact search filter.
#[derive(Default)]
pub struct ScriptedDirectory {
    entries: Mutex<HashMap<String, Vec<DirectoryEntry>>>,
    passwords: Mutex<HashMap<String, String>>,
    groups: Mutex<HashMap<String, Vec<String>>>,
    pub fail_search: AtomicBool,
    pub search_delay: Mutex<Option<Duration>>,
    pub searches: AtomicUsize,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        let directory = Self::default();
        directory.set_password(SERVICE_DN, SERVICE_PASSWORD);
        directory
    }

    fn set_password(&self, dn: &str, password: &str) {
        self.passwords
            .lock()
            .unwrap()
            .insert(dn.to_string(), password.to_string());
    }

    /// Register a user found by the default `(sAMAccountName={username})` filter.
    pub fn add_user(&self, username: &str, entry: DirectoryEntry, password: &str, groups: &[&str]) {
        self.set_password(&entry.dn, password);
        self.groups
            .lock()
            .unwrap()
            .insert(entry.dn.clone(), names(groups));
        self.add_entry(username, entry);
    }

    pub fn add_entry(&self, username: &str, entry: DirectoryEntry) {
        self.entries
            .lock()
            .unwrap()
            .entry(format!("(sAMAccountName={})", username))
            .or_default()
            .push(entry);
    }
}

#[async_trait]
impl DirectoryClient for ScriptedDirectory {
    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        match self.passwords.lock().unwrap().get(dn) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(DirectoryError::InvalidCredentials),
        }
    }

    async fn search(&self, _base: &str, filter: &str) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.search_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("connection refused".to_string()));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(filter)
            .cloned()
            .unwrap_or_default())
    }

    async fn groups_of(&self, dn: &str) -> Result<Vec<String>, DirectoryError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .get(dn)
            .cloned()
            .unwrap_or_default())
    }
}

/// Identity provider double with fixed users and issued tokens.
#[derive(Default)]
pub struct ScriptedIdp {
    passwords: Mutex<HashMap<String, String>>,
    identities: Mutex<HashMap<String, ExternalIdentity>>,
    pub delay: Mutex<Option<Duration>>,
    pub userinfo_calls: AtomicUsize,
}

impl ScriptedIdp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.passwords
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
    }

    pub fn add_token(&self, token: &str, email: &str) {
        self.identities.lock().unwrap().insert(
            token.to_string(),
            ExternalIdentity {
                sub: Uuid::new_v4().to_string(),
                email: Some(email.to_string()),
                preferred_username: None,
                email_verified: true,
            },
        );
    }
}

#[async_trait]
impl ExternalIdentityClient for ScriptedIdp {
    async fn verify_password(&self, username: &str, password: &str) -> Result<ExternalToken, IdpError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.passwords.lock().unwrap().get(username) {
            Some(expected) if expected == password => Ok(ExternalToken {
                access_token: "external-access".to_string(),
                refresh_token: None,
                expires_in: 300,
            }),
            _ => Err(IdpError::Rejected(401)),
        }
    }

    async fn resolve_identity(&self, access_token: &str) -> Result<ExternalIdentity, IdpError> {
        self.userinfo_calls.fetch_add(1, Ordering::SeqCst);
        self.identities
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or(IdpError::Rejected(401))
    }
}

/// Store whose workspace role lookups fail with a backend error.
pub struct WorkspaceOutageStore {
    pub inner: Arc<MemoryCredentialStore>,
}

#[async_trait]
impl CredentialStore for WorkspaceOutageStore {
    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Account, StoreError> {
        self.inner.find_account_by_id(account_id).await
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.inner.find_account_by_email(email).await
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Account, StoreError> {
        self.inner.find_account_by_username(username).await
    }

    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        self.inner.create_account(account).await
    }

    async fn update_password(&self, account_id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        self.inner.update_password(account_id, password_hash).await
    }

    async fn workspace_role(&self, _account_id: Uuid, _workspace_id: Uuid) -> Result<Role, StoreError> {
        Err(StoreError::Backend(anyhow::anyhow!("workspace table unavailable")))
    }

    async fn repository_role(&self, account_id: Uuid, repository_id: Uuid) -> Result<Role, StoreError> {
        self.inner.repository_role(account_id, repository_id).await
    }

    async fn workspace_groups(&self, workspace_id: Uuid) -> Result<AuthzGroupSet, StoreError> {
        self.inner.workspace_groups(workspace_id).await
    }

    async fn repository_groups(&self, repository_id: Uuid) -> Result<AuthzGroupSet, StoreError> {
        self.inner.repository_groups(repository_id).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
