//! Route-level role guard.
//!
//! Handlers call [`require_roles`] first thing, after the bearer middleware has
//! already rejected unauthenticated requests.

use keystone_auth::{RoleRequirement, UserRole, authorize};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub fn require_roles(
    principal: &PrincipalContext,
    required: &RoleRequirement,
) -> Result<(), ApiError> {
    authorize(principal.principal(), required)?;
    Ok(())
}

pub fn require_admin(principal: &PrincipalContext) -> Result<(), ApiError> {
    require_roles(principal, &RoleRequirement::admin())
}

/// Routes open to every signed-in role.
pub fn require_member(principal: &PrincipalContext) -> Result<(), ApiError> {
    require_roles(
        principal,
        &RoleRequirement::one_of([UserRole::User, UserRole::Admin]),
    )
}
