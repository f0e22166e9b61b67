//! Directory provider.
//!
//! Login binds against a directory service; authorization matches the
//! directory groups carried in the credential against scope group sets.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::IdentityProvider;
use crate::authz::GroupResolver;
use crate::config::LdapConfig;
use crate::models::{Account, AuthResponse, AuthType, AuthorizationRequest, Credential};
use crate::services::error::AuthError;
use crate::services::session::SessionIssuer;
use crate::store::{CredentialStore, StoreError};
use crate::utils::unusable_password_hash;

const MAIL_ATTRIBUTE: &str = "mail";
const MEMBER_OF_ATTRIBUTE: &str = "memberOf";
/// Result code for a rejected simple bind.
const INVALID_CREDENTIALS_RC: u32 = 49;
/// Used for placeholder emails when the base DN carries no `dc` components.
const FALLBACK_MAIL_DOMAIN: &str = "directory.invalid";

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory rejected the bind")]
    InvalidCredentials,

    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Directory error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// One search result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes
            .entry(name.to_string())
            .or_default()
            .push(value.into());
        self
    }

    /// Attribute values; names compare case-insensitively.
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

/// Connection to a bind/search directory service.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    async fn search(&self, base: &str, filter: &str) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Names of the groups `dn` belongs to.
    async fn groups_of(&self, dn: &str) -> Result<Vec<String>, DirectoryError>;
}

#[derive(Clone)]
pub struct LdapProvider {
    config: LdapConfig,
    directory: Arc<dyn DirectoryClient>,
    store: Arc<dyn CredentialStore>,
    sessions: SessionIssuer,
    resolver: GroupResolver,
}

impl LdapProvider {
    pub fn new(
        config: LdapConfig,
        directory: Arc<dyn DirectoryClient>,
        store: Arc<dyn CredentialStore>,
        sessions: SessionIssuer,
        enable_application_admin: bool,
    ) -> Self {
        let resolver = GroupResolver::new(
            store.clone(),
            enable_application_admin,
            config.admin_group.clone(),
        );
        Self {
            config,
            directory,
            store,
            sessions,
            resolver,
        }
    }

    /// Run a directory call under the configured timeout. Any failure is `Unauthorized`.
    async fn call<T, F>(&self, step: &'static str, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, DirectoryError>>,
    {
        match tokio::time::timeout(self.config.timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(step, error = %e, "ldap: directory call failed");
                Err(AuthError::Unauthorized)
            }
            Err(_) => {
                tracing::warn!(step, timeout_seconds = self.config.timeout_seconds, "ldap: directory call timed out");
                Err(AuthError::Unauthorized)
            }
        }
    }

    async fn find_user_entry(&self, username: &str) -> Result<DirectoryEntry, AuthError> {
        let filter = self
            .config
            .user_filter
            .replace("{username}", &escape_filter_value(username));

        let mut entries = self
            .call("search", self.directory.search(&self.config.base, &filter))
            .await?;

        match entries.len() {
            0 => Err(AuthError::UserNotFound),
            1 => Ok(entries.remove(0)),
            count => {
                tracing::warn!(count, "ldap: search matched more than one entry");
                Err(AuthError::TooManyEntries)
            }
        }
    }

    /// Accounts for directory users are created on first login, keyed by
    /// directory username.
    async fn find_or_create_account(
        &self,
        username: &str,
        entry: &DirectoryEntry,
    ) -> Result<Account, AuthError> {
        match self.store.find_account_by_username(username).await {
            Ok(account) => return Ok(account),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(AuthError::Store(e)),
        }

        let email = entry
            .first(MAIL_ATTRIBUTE)
            .map(str::trim)
            .filter(|mail| !mail.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_email(username, &self.config.base));
        let password_hash = unusable_password_hash()?;
        let mut account =
            Account::new(email, username.to_string(), password_hash.into_string()).confirmed();

        match self.store.create_account(&account).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                // Lost a race against a concurrent first login.
                match self.store.find_account_by_username(username).await {
                    Ok(existing) => return Ok(existing),
                    Err(StoreError::NotFound) => {}
                    Err(e) => return Err(AuthError::Store(e)),
                }

                // The directory mail belongs to another local account.
                tracing::warn!(
                    account_id = %account.account_id,
                    "ldap: directory mail already in use, assigning placeholder email"
                );
                let local_part = format!("{}+{}", username, account.account_id.simple());
                account.email = placeholder_email(&local_part, &self.config.base);
                self.store.create_account(&account).await?;
            }
            Err(e) => return Err(AuthError::Store(e)),
        }

        tracing::info!(account_id = %account.account_id, "Created account for directory user");
        Ok(account)
    }
}

#[async_trait]
impl IdentityProvider for LdapProvider {
    fn auth_type(&self) -> AuthType {
        AuthType::Ldap
    }

    async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse, AuthError> {
        if !self.config.has_bind_credentials() {
            tracing::error!("ldap: bind credentials are not configured");
            return Err(AuthError::Unauthorized);
        }
        // An empty password would turn the user bind into an anonymous bind.
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Unauthorized);
        }

        self.call(
            "service bind",
            self.directory
                .bind(&self.config.bind_dn, &self.config.bind_password),
        )
        .await?;

        let entry = self.find_user_entry(identifier).await?;

        self.call("user bind", self.directory.bind(&entry.dn, password))
            .await?;

        let groups = self
            .call("groups", self.directory.groups_of(&entry.dn))
            .await?;

        let account = self.find_or_create_account(identifier, &entry).await?;
        let response = self.sessions.issue(&account.profile(), groups).await?;

        tracing::info!(account_id = %account.account_id, "Directory login successful");
        Ok(response)
    }

    async fn is_authorized(&self, request: &AuthorizationRequest) -> Result<bool, AuthError> {
        let credential = self.sessions.jwt().decode(&request.token)?;
        self.resolver.is_authorized(&credential, request).await
    }

    async fn resolve_token(&self, token: &str) -> Result<Credential, AuthError> {
        self.sessions.jwt().decode(token)
    }
}

/// `DirectoryClient` over LDAP v3.
///
/// Each call opens its own connection. Searches and group lookups bind as
/// the configured service account; `bind` only proves the given credentials.
#[derive(Clone)]
pub struct LdapDirectoryClient {
    url: String,
    bind_dn: String,
    bind_password: String,
    timeout: Duration,
}

impl LdapDirectoryClient {
    pub fn new(config: &LdapConfig) -> Self {
        let scheme = if config.use_ssl { "ldaps" } else { "ldap" };
        Self {
            url: format!("{}://{}:{}", scheme, config.host, config.port),
            bind_dn: config.bind_dn.clone(),
            bind_password: config.bind_password.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Ldap, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(unavailable)?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::debug!(error = %e, "ldap: connection closed with error");
            }
        });
        Ok(ldap)
    }

    async fn session(&self, dn: &str, password: &str) -> Result<Ldap, DirectoryError> {
        let mut ldap = self.connect().await?;
        if let Err(e) = ldap.simple_bind(dn, password).await.and_then(|r| r.success()) {
            close(ldap).await;
            return Err(bind_error(e));
        }
        Ok(ldap)
    }

    async fn service_search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
        attributes: Vec<&str>,
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let mut ldap = self.session(&self.bind_dn, &self.bind_password).await?;
        let result = ldap
            .search(base, scope, filter, attributes)
            .await
            .and_then(|r| r.success());
        close(ldap).await;

        let (entries, _) = result.map_err(unavailable)?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn bind(&self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let ldap = self.session(dn, password).await?;
        close(ldap).await;
        Ok(())
    }

    async fn search(&self, base: &str, filter: &str) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.service_search(base, Scope::Subtree, filter, vec![MAIL_ATTRIBUTE])
            .await
    }

    /// Group names are the leading RDN values of the entry's `memberOf` DNs.
    async fn groups_of(&self, dn: &str) -> Result<Vec<String>, DirectoryError> {
        let entries = self
            .service_search(dn, Scope::Base, "(objectClass=*)", vec![MEMBER_OF_ATTRIBUTE])
            .await?;
        Ok(entries
            .iter()
            .flat_map(|entry| entry.values(MEMBER_OF_ATTRIBUTE))
            .map(|group_dn| group_name(group_dn).to_string())
            .collect())
    }
}

async fn close(mut ldap: Ldap) {
    if let Err(e) = ldap.unbind().await {
        tracing::debug!(error = %e, "ldap: unbind failed");
    }
}

fn unavailable(e: LdapError) -> DirectoryError {
    DirectoryError::Unavailable(e.to_string())
}

fn bind_error(e: LdapError) -> DirectoryError {
    match e {
        LdapError::LdapResult { result } if result.rc == INVALID_CREDENTIALS_RC => {
            DirectoryError::InvalidCredentials
        }
        other => unavailable(other),
    }
}

/// `cn=ops,ou=groups,dc=example,dc=com` -> `ops`.
fn group_name(dn: &str) -> &str {
    let rdn = dn.split(',').next().unwrap_or(dn);
    rdn.split_once('=')
        .map(|(_, value)| value)
        .unwrap_or(rdn)
        .trim()
}

/// `{local}@{domain}` with the domain taken from the `dc` components of `base`.
fn placeholder_email(local: &str, base: &str) -> String {
    let labels: Vec<&str> = base
        .split(',')
        .filter_map(|rdn| rdn.split_once('='))
        .filter(|(attribute, _)| attribute.trim().eq_ignore_ascii_case("dc"))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if labels.is_empty() {
        format!("{}@{}", local, FALLBACK_MAIL_DOMAIN)
    } else {
        format!("{}@{}", local, labels.join("."))
    }
}

/// Escape a value for use inside an LDAP search filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            other => escaped.push(other),
        }
    }
    escaped
}
