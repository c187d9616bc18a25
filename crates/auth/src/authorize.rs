//! Route-level role checks and ownership rules.

use thiserror::Error;

use crate::{Principal, UserRole};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("{0}")]
    Forbidden(String),
}

/// Roles a route declares.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoleRequirement {
    /// No roles declared: every caller that reached the route passes.
    #[default]
    Any,
    /// Any authenticated principal, whatever its role.
    AnyAuthenticated,
    /// Principal's role must be one of these.
    OneOf(Vec<UserRole>),
}

impl RoleRequirement {
    pub fn one_of(roles: impl IntoIterator<Item = UserRole>) -> Self {
        Self::OneOf(roles.into_iter().collect())
    }

    pub fn admin() -> Self {
        Self::OneOf(vec![UserRole::Admin])
    }
}

/// Decide whether `principal` may access a route guarded by `required`.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &RoleRequirement) -> Result<(), AuthzError> {
    match required {
        RoleRequirement::Any | RoleRequirement::AnyAuthenticated => Ok(()),
        RoleRequirement::OneOf(roles) if roles.is_empty() => Ok(()),
        RoleRequirement::OneOf(roles) => {
            if roles.contains(&principal.role) {
                return Ok(());
            }
            let required = roles
                .iter()
                .map(UserRole::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Err(AuthzError::Forbidden(format!(
                "User with role {} does not have access to this route. Required roles: {}",
                principal.role, required
            )))
        }
    }
}

/// Allow the resource owner or any admin; anyone else gets `message`.
pub fn ensure_self_or_admin(
    principal: &Principal,
    target: &str,
    message: &str,
) -> Result<(), AuthzError> {
    if principal.is_admin() || principal.user_id.to_string() == target {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(message.to_string()))
    }
}
