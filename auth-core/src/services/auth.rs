use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use validator::ValidateEmail;

use super::{
    error::AuthError, notifier::ResetCodeNotifier, policy::PasswordPolicy,
    session::SessionIssuer,
};
use crate::config::PasswordResetConfig;
use crate::controller::AuthController;
use crate::models::{AuthResponse, AuthType, AuthorizationRequest, Credential};
use crate::store::{CredentialStore, StoreError};
use crate::utils::{hash_password, Password};

const RESET_KEY_PREFIX: &str = "password-reset:";
const RESET_CODE_LENGTH: usize = 6;
const RESET_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Entry point for everything a transport layer needs from the core.
#[derive(Clone)]
pub struct AuthService {
    controller: AuthController,
    store: Arc<dyn CredentialStore>,
    sessions: SessionIssuer,
    notifier: Arc<dyn ResetCodeNotifier>,
    policy: PasswordPolicy,
    password_reset: PasswordResetConfig,
}

impl AuthService {
    pub fn new(
        controller: AuthController,
        store: Arc<dyn CredentialStore>,
        sessions: SessionIssuer,
        notifier: Arc<dyn ResetCodeNotifier>,
        policy: PasswordPolicy,
        password_reset: PasswordResetConfig,
    ) -> Self {
        Self {
            controller,
            store,
            sessions,
            notifier,
            policy,
            password_reset,
        }
    }

    pub fn controller(&self) -> &AuthController {
        &self.controller
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse, AuthError> {
        self.controller.login(identifier, password).await
    }

    pub async fn is_authorized(&self, request: &AuthorizationRequest) -> Result<bool, AuthError> {
        self.controller.is_authorized(request).await
    }

    pub async fn account_from_token(&self, token: &str) -> Result<Credential, AuthError> {
        self.controller.resolve_token(token).await
    }

    /// Trade a refresh token for a new session. The old token is consumed.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        if self.controller.auth_type().is_none() {
            return Err(AuthError::AuthTypeInvalid);
        }

        let entry = self.sessions.redeem(refresh_token).await?;

        let account = match self.store.find_account_by_id(entry.account_id).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                tracing::warn!(account_id = %entry.account_id, "Refresh for deleted account");
                return Err(AuthError::InvalidOrExpiredToken);
            }
            Err(e) => return Err(AuthError::Store(e)),
        };

        let response = self
            .sessions
            .issue(&account.profile(), entry.permissions)
            .await?;
        tracing::info!(account_id = %account.account_id, "Session refreshed");
        Ok(response)
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.sessions.revoke(refresh_token).await
    }

    /// Issue a reset code. Unknown emails succeed silently.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        self.require_local_passwords()?;

        if !email.validate_email() {
            return Ok(());
        }

        let account = match self.store.find_account_by_email(email).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(());
            }
            Err(e) => return Err(AuthError::Store(e)),
        };

        let code = generate_reset_code();
        let ttl = std::time::Duration::from_secs(
            self.password_reset.code_expiry_minutes.max(0) as u64 * 60,
        );
        self.sessions
            .cache()
            .set(&reset_key(email), &code, ttl)
            .await?;

        self.notifier.send_reset_code(&account.email, &code).await?;

        tracing::info!(account_id = %account.account_id, "Password reset requested");
        Ok(())
    }

    /// Exchange a reset code for a short-lived credential. Each code works once.
    pub async fn redeem_password_reset(&self, email: &str, code: &str) -> Result<String, AuthError> {
        self.require_local_passwords()?;

        let key = reset_key(email);
        let stored = self
            .sessions
            .cache()
            .get(&key)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        if !codes_match(&stored, code) {
            tracing::info!("Password reset code mismatch");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        // A concurrent redemption may have consumed it between get and take.
        match self.sessions.cache().take(&key).await? {
            Some(taken) if codes_match(&taken, code) => {}
            _ => return Err(AuthError::InvalidOrExpiredToken),
        }

        let account = match self.store.find_account_by_email(email).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidOrExpiredToken),
            Err(e) => return Err(AuthError::Store(e)),
        };

        let jwt = self.sessions.jwt();
        let credential = jwt.mint(
            &account.profile(),
            Vec::new(),
            chrono::Duration::minutes(self.password_reset.token_expiry_minutes),
        );
        let token = jwt.encode(&credential)?;

        tracing::info!(account_id = %account.account_id, "Password reset code redeemed");
        Ok(token)
    }

    /// Set a new password for the bearer of `token`.
    pub async fn change_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        self.require_local_passwords()?;

        let credential = self.sessions.jwt().decode(token)?;
        self.policy.validate(new_password)?;

        let password_hash = hash_password(&Password::new(new_password)).map_err(|e| {
            AuthError::Internal(anyhow::anyhow!("Password hashing error: {}", e))
        })?;

        match self
            .store
            .update_password(credential.account_id(), password_hash.as_str())
            .await
        {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(AuthError::InvalidOrExpiredToken),
            Err(e) => return Err(AuthError::Store(e)),
        }

        tracing::info!(account_id = %credential.account_id(), "Password changed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AuthError> {
        self.store.health_check().await?;
        self.sessions.cache().health_check().await?;
        Ok(())
    }

    /// Passwords are only owned locally under the local provider.
    fn require_local_passwords(&self) -> Result<(), AuthError> {
        match self.controller.auth_type() {
            Some(AuthType::Horusec) => Ok(()),
            _ => Err(AuthError::AuthTypeInvalid),
        }
    }
}

fn reset_key(email: &str) -> String {
    format!("{}{}", RESET_KEY_PREFIX, email.trim().to_lowercase())
}

fn codes_match(stored: &str, candidate: &str) -> bool {
    bool::from(stored.as_bytes().ct_eq(candidate.as_bytes()))
}

/// Six characters drawn uniformly from `[A-Za-z0-9]`.
pub fn generate_reset_code() -> String {
    let mut rng = rand::thread_rng();
    (0..RESET_CODE_LENGTH)
        .map(|_| RESET_CODE_ALPHABET[rng.gen_range(0..RESET_CODE_ALPHABET.len())] as char)
        .collect()
}
