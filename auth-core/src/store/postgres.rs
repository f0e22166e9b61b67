//! PostgreSQL credential store.
//!
//! Uses sqlx runtime queries against the schema in `auth-core/migrations`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{CredentialStore, StoreError};
use crate::config::DatabaseConfig;
use crate::models::{Account, AuthzGroupSet, Role};

const ACCOUNT_COLUMNS: &str = "account_id, email, username, password, is_confirmed, \
     is_application_admin, created_at, updated_at";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        tracing::info!(max_connections = config.max_connections, "Connecting to PostgreSQL");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        tracing::info!("Successfully connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(anyhow::anyhow!("Migration failed: {}", e)))
    }

    async fn find_account_where(&self, clause: &str, value: &str) -> Result<Account, StoreError> {
        let query = format!("SELECT {} FROM accounts WHERE {}", ACCOUNT_COLUMNS, clause);
        sqlx::query_as::<_, Account>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_role(
        &self,
        query: &str,
        account_id: Uuid,
        scope_id: Uuid,
    ) -> Result<Role, StoreError> {
        let role: String = sqlx::query_scalar(query)
            .bind(account_id)
            .bind(scope_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        role.parse()
            .map_err(|e: String| StoreError::Backend(anyhow::anyhow!(e)))
    }

    async fn find_groups(&self, query: &str, scope_id: Uuid) -> Result<AuthzGroupSet, StoreError> {
        let (admin, supervisor, member): (Vec<String>, Vec<String>, Vec<String>) =
            sqlx::query_as(query)
                .bind(scope_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(StoreError::NotFound)?;

        Ok(AuthzGroupSet::new(admin, supervisor, member))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Account, StoreError> {
        let query = format!(
            "SELECT {} FROM accounts WHERE account_id = $1",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, Account>(&query)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        self.find_account_where("LOWER(email) = LOWER($1)", email)
            .await
    }

    async fn find_account_by_username(&self, username: &str) -> Result<Account, StoreError> {
        self.find_account_where("username = $1", username).await
    }

    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, email, username, password, is_confirmed, is_application_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.account_id)
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password)
        .bind(account.is_confirmed)
        .bind(account.is_application_admin)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            other => StoreError::Database(other),
        })?;
        Ok(())
    }

    async fn update_password(
        &self,
        account_id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE accounts SET password = $1, updated_at = $2 WHERE account_id = $3")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(account_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn workspace_role(
        &self,
        account_id: Uuid,
        workspace_id: Uuid,
    ) -> Result<Role, StoreError> {
        self.find_role(
            "SELECT role FROM account_workspace WHERE account_id = $1 AND workspace_id = $2",
            account_id,
            workspace_id,
        )
        .await
    }

    async fn repository_role(
        &self,
        account_id: Uuid,
        repository_id: Uuid,
    ) -> Result<Role, StoreError> {
        self.find_role(
            "SELECT role FROM account_repository WHERE account_id = $1 AND repository_id = $2",
            account_id,
            repository_id,
        )
        .await
    }

    async fn workspace_groups(&self, workspace_id: Uuid) -> Result<AuthzGroupSet, StoreError> {
        self.find_groups(
            "SELECT authz_admin, authz_supervisor, authz_member FROM workspaces WHERE workspace_id = $1",
            workspace_id,
        )
        .await
    }

    async fn repository_groups(&self, repository_id: Uuid) -> Result<AuthzGroupSet, StoreError> {
        self.find_groups(
            "SELECT authz_admin, authz_supervisor, authz_member FROM repositories WHERE repository_id = $1",
            repository_id,
        )
        .await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                StoreError::Database(e)
            })?;
        Ok(())
    }
}
