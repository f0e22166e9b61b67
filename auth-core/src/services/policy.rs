//! Password policy validation.
//!
//! Applied when a password is changed through the reset flow.

use thiserror::Error;

use crate::config::PasswordPolicyConfig;

/// Errors related to password policy validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Password must be at least {min_length} characters (got {actual_length})")]
    PasswordTooShort {
        min_length: usize,
        actual_length: usize,
    },

    #[error("Password must contain at least one uppercase letter")]
    PasswordMissingUppercase,

    #[error("Password must contain at least one number")]
    PasswordMissingNumber,

    #[error("Password must contain at least one special character")]
    PasswordMissingSpecial,
}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    config: PasswordPolicyConfig,
}

impl PasswordPolicy {
    pub fn new(config: PasswordPolicyConfig) -> Self {
        Self { config }
    }

    /// Returns the first violation found.
    pub fn validate(&self, password: &str) -> Result<(), PolicyError> {
        let length = password.chars().count();
        if length < self.config.min_length {
            return Err(PolicyError::PasswordTooShort {
                min_length: self.config.min_length,
                actual_length: length,
            });
        }

        if self.config.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(PolicyError::PasswordMissingUppercase);
        }

        if self.config.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PolicyError::PasswordMissingNumber);
        }

        if self.config.require_special && !password.chars().any(|c| c.is_ascii_punctuation()) {
            return Err(PolicyError::PasswordMissingSpecial);
        }

        Ok(())
    }
}
