//! User management with ownership rules.

use chrono::Utc;
use tracing::info;

use keystone_auth::{Principal, SafeUser, User, ensure_self_or_admin};
use keystone_core::{DomainError, Page, Paginated, UserId};
use keystone_infra::StoreError;

use super::AppServices;
use crate::app::dto::{CreateUserRequest, UpdateUserRequest};
use crate::app::errors::ApiError;

fn user_not_found(id: &str) -> ApiError {
    DomainError::not_found(format!("User with ID {id} not found")).into()
}

fn email_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => DomainError::conflict("Email already exists").into(),
        StoreError::NotFound => DomainError::not_found("User not found").into(),
        other => other.into(),
    }
}

/// Unparsable ids can't match any row.
fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse().map_err(|_| user_not_found(raw))
}

impl AppServices {
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<SafeUser, ApiError> {
        let email = req.email.unwrap_or_default();
        let password = req.password.unwrap_or_default();

        let hash = self.hash(&password).await?;
        let user = User::new(
            email,
            req.name.filter(|n| !n.trim().is_empty()),
            Some(hash),
            req.role.unwrap_or_default(),
            req.image,
            Utc::now(),
        );
        let user = self.users.insert(user).await.map_err(email_conflict)?;

        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user.to_safe())
    }

    pub async fn list_users(&self, page: Page) -> Result<Paginated<SafeUser>, ApiError> {
        let (users, total) = self.users.list(page).await?;
        Ok(Paginated::new(users, page, total).map(SafeUser::from))
    }

    /// The caller's own account. A token that outlived its user is rejected.
    pub async fn current_user(&self, principal: &Principal) -> Result<SafeUser, ApiError> {
        self.users
            .find_by_id(principal.user_id)
            .await?
            .map(|u| u.to_safe())
            .ok_or_else(|| DomainError::unauthorized("User account not found").into())
    }

    pub async fn get_user(&self, principal: &Principal, id: &str) -> Result<SafeUser, ApiError> {
        ensure_self_or_admin(principal, id, "You are not authorized to view this user")?;

        let user_id = parse_user_id(id)?;
        self.users
            .find_by_id(user_id)
            .await?
            .map(|u| u.to_safe())
            .ok_or_else(|| user_not_found(id))
    }

    pub async fn update_user(
        &self,
        principal: &Principal,
        id: &str,
        req: UpdateUserRequest,
    ) -> Result<SafeUser, ApiError> {
        ensure_self_or_admin(principal, id, "You can only update your own profile")?;
        if req.role.is_some() && !principal.is_admin() {
            return Err(DomainError::forbidden("Only administrators can update user roles").into());
        }

        let user_id = parse_user_id(id)?;
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| user_not_found(id))?;

        if let Some(new_password) = req.password.as_deref() {
            let Some(current) = req.current_password.as_deref() else {
                return Err(ApiError::bad_request(
                    "Current password is required to change password",
                ));
            };
            let matches = match user.password_hash.as_deref() {
                Some(hash) => self.verify(current, hash).await?,
                None => false,
            };
            if !matches {
                return Err(ApiError::bad_request("Current password is incorrect"));
            }
            user.password_hash = Some(self.hash(new_password).await?);
        }

        if let Some(name) = req.name {
            user.name = Some(name);
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        if let Some(image) = req.image {
            user.image = Some(image);
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        let user = self.users.update(user).await.map_err(|e| match e {
            StoreError::NotFound => user_not_found(id),
            other => email_conflict(other),
        })?;

        info!(user_id = %user.id, actor = %principal.user_id, "user updated");
        Ok(user.to_safe())
    }

    pub async fn delete_user(&self, principal: &Principal, id: &str) -> Result<(), ApiError> {
        let user_id = parse_user_id(id)?;
        let Some(user) = self.users.delete(user_id).await? else {
            return Err(user_not_found(id));
        };
        // Postgres cascades; the in-memory store needs the explicit cleanup.
        self.sessions.delete_for_user(user.id).await?;

        info!(user_id = %user.id, actor = %principal.user_id, "user deleted");
        Ok(())
    }
}
