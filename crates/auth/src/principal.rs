use serde::{Deserialize, Serialize};

use keystone_core::UserId;

use crate::{JwtClaims, UserRole};

/// The authenticated identity attached to a request.
///
/// Built from verified token claims. It is a snapshot: role changes take effect
/// on the next login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&JwtClaims> for Principal {
    fn from(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}
