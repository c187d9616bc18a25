//! Password hashing (bcrypt) and strength policy.

use thiserror::Error;

/// Cost used when none is configured. Hashes from other bcrypt
/// implementations at any cost still verify.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

const SPECIAL_CHARS: &str = "!@#$%^&*";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is unreadable: {0}")]
    CorruptHash(String),
}

pub fn hash_password(plain: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(plain, cost).map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Returns `Ok(false)` on mismatch; errors only when `hash` is not a bcrypt hash.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(plain, hash).map_err(|e| PasswordError::CorruptHash(e.to_string()))
}

/// Strength rules applied to new passwords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_lowercase: true,
            require_uppercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    /// Check `password`, reporting every rule it breaks.
    pub fn validate(&self, password: &str) -> Result<(), Vec<String>> {
        if password.is_empty() {
            return Err(vec!["Password is required".to_string()]);
        }

        let mut violations = Vec::new();
        if password.chars().count() < self.min_length {
            violations.push(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            violations.push("Password must contain at least one lowercase letter".to_string());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            violations.push("Password must contain at least one uppercase letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push("Password must contain at least one number".to_string());
        }
        if self.require_special && !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
            violations.push(format!(
                "Password must contain at least one special character ({SPECIAL_CHARS})"
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
