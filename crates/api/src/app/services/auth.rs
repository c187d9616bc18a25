//! Registration, credential login, password reset and browser sessions.

use chrono::{Duration, Utc};
use tracing::{info, warn};
use url::Url;

use keystone_auth::{JwtIssuer, SafeUser, User, UserRole, generate_token};
use keystone_infra::{Session, StoreError};

use super::AppServices;
use crate::app::dto::{LoginResponse, RegisterRequest};
use crate::app::errors::ApiError;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const RESET_REQUESTED: &str =
    "If an account exists with this email, you will receive a password reset link";
pub const PASSWORD_RESET_DONE: &str = "Password has been reset successfully";
const RESET_TOKEN_TTL_HOURS: i64 = 1;

fn reset_link(app_url: &str, token: &str) -> Result<Url, ApiError> {
    let invalid =
        |reason: String| ApiError::Internal(format!("invalid APP_URL '{app_url}': {reason}"));
    let mut url = Url::parse(app_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(["auth", "reset-password"]);
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

impl AppServices {
    pub async fn register(&self, req: RegisterRequest) -> Result<SafeUser, ApiError> {
        let email = req.email.unwrap_or_default();
        let password = req.password.unwrap_or_default();
        if req.role.is_some_and(|r| r.is_admin()) {
            warn!(email = %email, "ignoring requested ADMIN role on self-registration");
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("User with this email already exists"));
        }

        let hash = self.hash(&password).await?;
        let user = User::new(email, req.name, Some(hash), UserRole::User, req.image, Utc::now());

        let user = self.users.insert(user).await.map_err(|e| match e {
            StoreError::Conflict(_) => ApiError::conflict("User with this email already exists"),
            other => other.into(),
        })?;

        info!(user_id = %user.id, "user registered");
        Ok(user.to_safe())
    }

    /// Look up `email` and check `password` against its hash.
    ///
    /// Unknown email, accounts without a password and wrong passwords all fail
    /// the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            self.verify_decoy(password).await?;
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        };
        let Some(hash) = user.password_hash.as_deref() else {
            self.verify_decoy(password).await?;
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        };
        if !self.verify(password, hash).await? {
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let user = self.authenticate(email, password).await?;
        let access_token = self.jwt.issue(&user, Utc::now())?;

        info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            access_token,
            user: user.to_safe(),
        })
    }

    /// Store a reset token for `email` and mail the link. Unknown addresses are
    /// silently ignored so callers can't discover accounts.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let Some(mut user) = self.users.find_by_email(email).await? else {
            return Ok(());
        };

        let now = Utc::now();
        let token = generate_token();
        let reset_url = reset_link(&self.config.app_url, &token)?;
        user.reset_token = Some(token.clone());
        user.reset_token_expiry = Some(now + Duration::hours(RESET_TOKEN_TTL_HOURS));
        user.updated_at = now;
        let user = self.users.update(user).await?;

        if let Err(e) = self.mailer.send_password_reset(&user.email, reset_url.as_str()).await {
            warn!(user_id = %user.id, error = %e, "failed to send password reset email");
        }
        Ok(())
    }

    pub async fn validate_reset_token(&self, token: &str) -> Result<bool, ApiError> {
        Ok(self
            .users
            .find_by_reset_token(token, Utc::now())
            .await?
            .is_some())
    }

    /// Set a new password using a reset token. Clears the token and signs the
    /// user out of every browser session.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), ApiError> {
        self.check_password_policy(password)?;

        let now = Utc::now();
        let Some(mut user) = self.users.find_by_reset_token(token, now).await? else {
            return Err(ApiError::bad_request("Invalid or expired reset token"));
        };

        user.password_hash = Some(self.hash(password).await?);
        user.reset_token = None;
        user.reset_token_expiry = None;
        user.updated_at = now;
        let user = self.users.update(user).await?;

        let revoked = self.sessions.delete_for_user(user.id).await?;
        info!(user_id = %user.id, revoked, "password reset");
        Ok(())
    }

    pub async fn start_session(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let user = self.authenticate(email, password).await?;
        let session = self.sessions.create(Session::new(user.id, Utc::now())).await?;

        info!(user_id = %user.id, "session started");
        Ok(session)
    }

    /// The user behind a session cookie, if the session is still valid.
    pub async fn session_user(&self, token: &str) -> Result<Option<SafeUser>, ApiError> {
        let Some(session) = self.sessions.find_valid(token, Utc::now()).await? else {
            return Ok(None);
        };

        match self.users.find_by_id(session.user_id).await? {
            Some(user) => Ok(Some(user.to_safe())),
            None => {
                self.sessions.delete(token).await?;
                Ok(None)
            }
        }
    }

    pub async fn end_session(&self, token: &str) -> Result<(), ApiError> {
        self.sessions.delete(token).await?;
        Ok(())
    }
}
