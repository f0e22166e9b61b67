use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::models::AuthType;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub auth_type: AuthType,
    pub enable_application_admin: bool,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub password_reset: PasswordResetConfig,
    pub password_policy: PasswordPolicyConfig,
    pub ldap: LdapConfig,
    pub keycloak: KeycloakConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret_key: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret_key", &"[REDACTED]")
            .field("access_token_expiry_minutes", &self.access_token_expiry_minutes)
            .field("refresh_token_expiry_minutes", &self.refresh_token_expiry_minutes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PasswordResetConfig {
    /// Lifetime of an emailed reset code.
    pub code_expiry_minutes: i64,
    /// Lifetime of the credential handed out for a redeemed code.
    pub token_expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_number: bool,
    pub require_special: bool,
}

#[derive(Clone)]
pub struct LdapConfig {
    pub host: String,
    pub port: u16,
    pub base: String,
    pub use_ssl: bool,
    pub bind_dn: String,
    pub bind_password: String,
    /// Search filter with a `{username}` placeholder, e.g. `(sAMAccountName={username})`.
    pub user_filter: String,
    /// Group granting application admin; unset disables directory-based app admin.
    pub admin_group: Option<String>,
    pub timeout_seconds: u64,
}

impl LdapConfig {
    pub fn has_bind_credentials(&self) -> bool {
        !self.bind_dn.trim().is_empty() && !self.bind_password.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base", &self.base)
            .field("use_ssl", &self.use_ssl)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .field("user_filter", &self.user_filter)
            .field("admin_group", &self.admin_group)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Clone)]
pub struct KeycloakConfig {
    pub base_path: String,
    pub client_id: String,
    pub client_secret: String,
    pub realm: String,
    pub timeout_seconds: u64,
}

impl KeycloakConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl std::fmt::Debug for KeycloakConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakConfig")
            .field("base_path", &self.base_path)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("realm", &self.realm)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = common.is_prod();
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let auth_type: AuthType = get("AUTH_TYPE", Some("horusec"))?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        // Provider settings are only demanded for the provider in use.
        let ldap_required = auth_type == AuthType::Ldap;
        let keycloak_required = auth_type == AuthType::Keycloak;
        let get_for = |key: &str, default: Option<&str>, required: bool| {
            if required {
                get(key, default)
            } else {
                Ok(lookup(key).unwrap_or_else(|| default.unwrap_or_default().to_string()))
            }
        };

        let config = AuthConfig {
            service_name: get("SERVICE_NAME", Some("auth-core"))?,
            auth_type,
            enable_application_admin: parse(
                "ENABLE_APPLICATION_ADMIN",
                get("ENABLE_APPLICATION_ADMIN", Some("false"))?,
            )?,
            database: DatabaseConfig {
                url: get("DATABASE_URL", None)?,
                max_connections: parse(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS", Some("10"))?,
                )?,
            },
            redis: RedisConfig {
                url: get("REDIS_URL", None)?,
            },
            jwt: JwtConfig {
                secret_key: get("JWT_SECRET_KEY", None)?,
                access_token_expiry_minutes: parse(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    get("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", Some("15"))?,
                )?,
                refresh_token_expiry_minutes: parse(
                    "JWT_REFRESH_TOKEN_EXPIRY_MINUTES",
                    get("JWT_REFRESH_TOKEN_EXPIRY_MINUTES", Some("60"))?,
                )?,
            },
            password_reset: PasswordResetConfig {
                code_expiry_minutes: parse(
                    "PASSWORD_RESET_CODE_EXPIRY_MINUTES",
                    get("PASSWORD_RESET_CODE_EXPIRY_MINUTES", Some("10"))?,
                )?,
                token_expiry_minutes: parse(
                    "PASSWORD_RESET_TOKEN_EXPIRY_MINUTES",
                    get("PASSWORD_RESET_TOKEN_EXPIRY_MINUTES", Some("15"))?,
                )?,
            },
            password_policy: PasswordPolicyConfig {
                min_length: parse(
                    "PASSWORD_MIN_LENGTH",
                    get("PASSWORD_MIN_LENGTH", Some("8"))?,
                )?,
                require_uppercase: parse(
                    "PASSWORD_REQUIRE_UPPERCASE",
                    get("PASSWORD_REQUIRE_UPPERCASE", Some("true"))?,
                )?,
                require_number: parse(
                    "PASSWORD_REQUIRE_NUMBER",
                    get("PASSWORD_REQUIRE_NUMBER", Some("true"))?,
                )?,
                require_special: parse(
                    "PASSWORD_REQUIRE_SPECIAL",
                    get("PASSWORD_REQUIRE_SPECIAL", Some("true"))?,
                )?,
            },
            ldap: LdapConfig {
                host: get_for("LDAP_HOST", None, ldap_required)?,
                port: parse(
                    "LDAP_PORT",
                    get_for("LDAP_PORT", Some("389"), ldap_required)?,
                )?,
                base: get_for("LDAP_BASE", None, ldap_required)?,
                use_ssl: parse(
                    "LDAP_USE_SSL",
                    get_for("LDAP_USE_SSL", Some("false"), ldap_required)?,
                )?,
                bind_dn: get_for("LDAP_BIND_DN", Some(""), ldap_required)?,
                bind_password: get_for("LDAP_BIND_PASSWORD", Some(""), ldap_required)?,
                user_filter: get_for(
                    "LDAP_USER_FILTER",
                    Some("(sAMAccountName={username})"),
                    ldap_required,
                )?,
                admin_group: lookup("LDAP_ADMIN_GROUP")
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty()),
                timeout_seconds: parse(
                    "LDAP_TIMEOUT_SECONDS",
                    get_for("LDAP_TIMEOUT_SECONDS", Some("10"), ldap_required)?,
                )?,
            },
            keycloak: KeycloakConfig {
                base_path: get_for("KEYCLOAK_BASE_PATH", None, keycloak_required)?,
                client_id: get_for("KEYCLOAK_CLIENT_ID", None, keycloak_required)?,
                client_secret: get_for("KEYCLOAK_CLIENT_SECRET", None, keycloak_required)?,
                realm: get_for("KEYCLOAK_REALM", None, keycloak_required)?,
                timeout_seconds: parse(
                    "KEYCLOAK_TIMEOUT_SECONDS",
                    get_for("KEYCLOAK_TIMEOUT_SECONDS", Some("10"), keycloak_required)?,
                )?,
            },
            common,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt.secret_key.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET_KEY must not be empty"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 || self.jwt.refresh_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT token expiries must be positive"
            )));
        }

        if self.password_reset.code_expiry_minutes <= 0
            || self.password_reset.token_expiry_minutes <= 0
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Password reset expiries must be positive"
            )));
        }

        match self.auth_type {
            AuthType::Horusec => {}
            AuthType::Ldap => {
                if !self.ldap.user_filter.contains("{username}") {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "LDAP_USER_FILTER must contain the {{username}} placeholder"
                    )));
                }
                if self.ldap.timeout_seconds == 0 {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "LDAP_TIMEOUT_SECONDS must be positive"
                    )));
                }
                if self.enable_application_admin && self.ldap.admin_group.is_none() {
                    tracing::warn!(
                        "Application admin is enabled but LDAP_ADMIN_GROUP is not set; application admin checks will fail"
                    );
                }
            }
            AuthType::Keycloak => {
                if self.keycloak.timeout_seconds == 0 {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "KEYCLOAK_TIMEOUT_SECONDS must be positive"
                    )));
                }
            }
        }

        // In production, ensure stricter validation
        if self.common.is_prod() && self.jwt.secret_key.len() < 32 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET_KEY must be at least 32 bytes in production"
            )));
        }

        Ok(())
    }
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse<T>(key: &str, value: String) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e))
    })
}
