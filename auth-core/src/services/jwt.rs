use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::error::AuthError;
use crate::config::JwtConfig;
use crate::models::{AccountProfile, Credential};

/// JWT service for credential signing and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_minutes: i64,
}

impl JwtService {
    /// Create a new JWT service from the shared HS256 secret
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        if config.secret_key.is_empty() {
            return Err(anyhow::anyhow!("JWT secret key must not be empty"));
        }

        let encoding_key = EncodingKey::from_secret(config.secret_key.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());

        tracing::info!("JWT service initialized with HS256 secret");

        Ok(Self {
            encoding_key,
            decoding_key,
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_minutes: config.refresh_token_expiry_minutes,
        })
    }

    /// Build claims for an account valid for `ttl` from now.
    pub fn mint(&self, profile: &AccountProfile, permissions: Vec<String>, ttl: Duration) -> Credential {
        let now = Utc::now();
        Credential {
            sub: profile.account_id,
            username: profile.username.clone(),
            email: profile.email.clone(),
            is_application_admin: profile.is_application_admin,
            permissions,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn encode(&self, credential: &Credential) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), credential, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to encode credential: {}", e)))
    }

    /// Validate signature and expiry, then return the claims.
    pub fn decode(&self, token: &str) -> Result<Credential, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Credential>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Credential rejected");
                AuthError::InvalidToken
            })
    }

    /// True when `token` carries the header of a credential signed here,
    /// whether or not it is still valid.
    pub fn is_local(&self, token: &str) -> bool {
        decode_header(token)
            .map(|header| header.alg == Algorithm::HS256)
            .unwrap_or(false)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_minutes)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::minutes(self.refresh_token_expiry_minutes)
    }
}
