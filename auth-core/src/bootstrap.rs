//! Process startup: wires configuration, backends and the chosen provider
//! into an `AuthService`.

use service_core::error::AppError;
use service_core::observability::logging::init_tracing;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::controller::{AuthController, ProviderSet};
use crate::models::AuthType;
use crate::providers::{
    DirectoryClient, ExternalIdentityClient, HorusecProvider, IdentityProvider, KeycloakClient,
    KeycloakProvider, LdapDirectoryClient, LdapProvider,
};
use crate::services::{
    AuthService, EphemeralCache, JwtService, LogNotifier, PasswordPolicy, RedisCache,
    ResetCodeNotifier, SessionIssuer,
};
use crate::store::{CredentialStore, PgCredentialStore};

/// Install the tracing subscriber described by the configuration.
pub fn init_observability(config: &AuthConfig) -> Result<(), AppError> {
    init_tracing(
        &config.service_name,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    )
    .map_err(AppError::InternalError)?;

    tracing::info!(
        service = %config.service_name,
        environment = ?config.common.environment,
        auth_type = %config.auth_type,
        "Starting authentication core"
    );
    Ok(())
}

pub struct AuthServiceBuilder {
    config: AuthConfig,
    store: Option<Arc<dyn CredentialStore>>,
    cache: Option<Arc<dyn EphemeralCache>>,
    notifier: Option<Arc<dyn ResetCodeNotifier>>,
    directory: Option<Arc<dyn DirectoryClient>>,
    idp: Option<Arc<dyn ExternalIdentityClient>>,
}

impl AuthServiceBuilder {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            store: None,
            cache: None,
            notifier: None,
            directory: None,
            idp: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn EphemeralCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn ResetCodeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn DirectoryClient>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn identity_client(mut self, idp: Arc<dyn ExternalIdentityClient>) -> Self {
        self.idp = Some(idp);
        self
    }

    /// Connect PostgreSQL (running migrations) and Redis for any backend not set yet.
    pub async fn connect_backends(mut self) -> Result<Self, AppError> {
        if self.store.is_none() {
            tracing::info!("Initializing database connections");
            let store = PgCredentialStore::connect(&self.config.database)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
            store
                .migrate()
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
            tracing::info!("Database initialized successfully");
            self.store = Some(Arc::new(store));
        }

        if self.cache.is_none() {
            let cache = RedisCache::new(&self.config.redis)
                .await
                .map_err(|e| AppError::CacheError(anyhow::Error::new(e)))?;
            tracing::info!("Redis cache initialized");
            self.cache = Some(Arc::new(cache));
        }

        Ok(self)
    }

    pub fn build(self) -> Result<AuthService, AppError> {
        let config = self.config;
        let store = self.store.ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("No credential store configured"))
        })?;
        let cache = self
            .cache
            .ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("No cache configured")))?;
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(LogNotifier) as Arc<dyn ResetCodeNotifier>);

        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let sessions = SessionIssuer::new(jwt, cache);
        let admin_mode = config.enable_application_admin;

        let provider: Arc<dyn IdentityProvider> = match config.auth_type {
            AuthType::Horusec => Arc::new(HorusecProvider::new(
                store.clone(),
                sessions.clone(),
                admin_mode,
            )),
            AuthType::Ldap => {
                let directory: Arc<dyn DirectoryClient> = match self.directory {
                    Some(directory) => directory,
                    None => Arc::new(LdapDirectoryClient::new(&config.ldap)),
                };
                Arc::new(LdapProvider::new(
                    config.ldap.clone(),
                    directory,
                    store.clone(),
                    sessions.clone(),
                    admin_mode,
                ))
            }
            AuthType::Keycloak => {
                let idp: Arc<dyn ExternalIdentityClient> = match self.idp {
                    Some(idp) => idp,
                    None => Arc::new(
                        KeycloakClient::new(config.keycloak.clone())
                            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?,
                    ),
                };
                Arc::new(KeycloakProvider::new(
                    store.clone(),
                    sessions.clone(),
                    idp,
                    &config.keycloak,
                    admin_mode,
                ))
            }
        };

        tracing::info!(auth_type = %config.auth_type, "Identity provider initialized");

        let controller = AuthController::new(config.auth_type, ProviderSet::new().with(provider));
        Ok(AuthService::new(
            controller,
            store,
            sessions,
            notifier,
            PasswordPolicy::new(config.password_policy.clone()),
            config.password_reset.clone(),
        ))
    }
}
