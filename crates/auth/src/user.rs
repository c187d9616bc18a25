//! User account record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keystone_core::UserId;

use crate::UserRole;

/// A stored user account, including credentials.
///
/// Never serialize this to clients; convert to [`SafeUser`] first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    /// bcrypt hash. Absent for accounts that were created without a password.
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh account. `name` falls back to the local part of the email.
    pub fn new(
        email: impl Into<String>,
        name: Option<String>,
        password_hash: Option<String>,
        role: UserRole,
        image: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let email = email.into();
        let name = name.or_else(|| Some(default_name(&email)));
        Self {
            id: UserId::new(),
            name,
            email,
            email_verified: None,
            image,
            password_hash,
            role,
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this user holds `token` and it has not yet expired.
    pub fn has_valid_reset_token(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_token, self.reset_token_expiry) {
            (Some(t), Some(expiry)) => t == token && expiry >= now,
            _ => false,
        }
    }

    pub fn to_safe(&self) -> SafeUser {
        SafeUser::from(self)
    }
}

fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Client-facing projection of [`User`] (no password or reset token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeUser {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub image: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for SafeUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            image: user.image.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for SafeUser {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}
