//! Session issuing: a signed access credential plus a single-use refresh token.

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::cache::EphemeralCache;
use super::error::AuthError;
use super::jwt::JwtService;
use crate::models::{AccountProfile, AuthResponse, RefreshEntry};

const REFRESH_KEY_PREFIX: &str = "refresh-token:";

#[derive(Clone)]
pub struct SessionIssuer {
    jwt: JwtService,
    cache: Arc<dyn EphemeralCache>,
}

impl SessionIssuer {
    pub fn new(jwt: JwtService, cache: Arc<dyn EphemeralCache>) -> Self {
        Self { jwt, cache }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn cache(&self) -> &Arc<dyn EphemeralCache> {
        &self.cache
    }

    /// Mint an access credential and store a refresh entry for it.
    pub async fn issue(
        &self,
        profile: &AccountProfile,
        permissions: Vec<String>,
    ) -> Result<AuthResponse, AuthError> {
        let credential = self
            .jwt
            .mint(profile, permissions.clone(), self.jwt.access_token_ttl());
        let access_token = self.jwt.encode(&credential)?;

        let refresh_token = generate_random_token();
        let entry = RefreshEntry {
            account_id: profile.account_id,
            permissions,
        };
        let value = serde_json::to_string(&entry)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to encode refresh entry: {}", e)))?;
        let ttl = self
            .jwt
            .refresh_token_ttl()
            .to_std()
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Invalid refresh window: {}", e)))?;

        self.cache
            .set(&refresh_key(&refresh_token), &value, ttl)
            .await?;

        tracing::debug!(account_id = %profile.account_id, "Session issued");

        Ok(AuthResponse {
            access_token,
            refresh_token,
            expires_at: credential.exp,
            username: profile.username.clone(),
            email: profile.email.clone(),
            is_application_admin: profile.is_application_admin,
        })
    }

    /// Consume a refresh token. A token is accepted at most once.
    pub async fn redeem(&self, refresh_token: &str) -> Result<RefreshEntry, AuthError> {
        let value = self
            .cache
            .take(&refresh_key(refresh_token))
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        serde_json::from_str(&value).map_err(|e| {
            tracing::warn!(error = %e, "Discarding unreadable refresh entry");
            AuthError::InvalidOrExpiredToken
        })
    }

    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.cache.delete(&refresh_key(refresh_token)).await?;
        Ok(())
    }
}

/// Cache key of a refresh token. Only a digest of the token is stored.
pub fn refresh_key(refresh_token: &str) -> String {
    let digest = Sha256::digest(refresh_token.as_bytes());
    format!("{}{}", REFRESH_KEY_PREFIX, hex::encode(digest))
}

/// Generate a cryptographically secure random token
pub fn generate_random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::services::cache::MemoryCache;
    use uuid::Uuid;

    fn issuer() -> SessionIssuer {
        let jwt = JwtService::new(&JwtConfig {
            secret_key: "test-secret".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_minutes: 60,
        })
        .unwrap();
        SessionIssuer::new(jwt, Arc::new(MemoryCache::new()))
    }

    fn profile() -> AccountProfile {
        AccountProfile {
            account_id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            is_application_admin: false,
        }
    }

    #[test]
    fn test_random_tokens_are_unique_hex() {
        let first = generate_random_token();
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, generate_random_token());
    }

    #[test]
    fn test_refresh_key_hides_token() {
        let key = refresh_key("abc");
        assert!(key.starts_with("refresh-token:"));
        assert!(!key.ends_with("abc"));
    }

    #[tokio::test]
    async fn test_issue_then_redeem_once() {
        let issuer = issuer();
        let profile = profile();
        let response = issuer
            .issue(&profile, vec!["devs".to_string()])
            .await
            .unwrap();

        let claims = issuer.jwt().decode(&response.access_token).unwrap();
        assert_eq!(claims.sub, profile.account_id);
        assert_eq!(response.expires_at, claims.exp);

        let entry = issuer.redeem(&response.refresh_token).await.unwrap();
        assert_eq!(entry.account_id, profile.account_id);
        assert_eq!(entry.permissions, vec!["devs"]);

        assert!(matches!(
            issuer.redeem(&response.refresh_token).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_be_redeemed() {
        let issuer = issuer();
        let response = issuer.issue(&profile(), vec![]).await.unwrap();
        issuer.revoke(&response.refresh_token).await.unwrap();

        assert!(issuer.redeem(&response.refresh_token).await.is_err());
    }
}
