//! Request/response DTOs and request validation.
//!
//! Request bodies reject unknown fields. Required fields are modelled as
//! `Option` so a missing value is reported through [`Validate`] with a readable
//! message rather than as a deserialization error.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use keystone_auth::{PasswordPolicy, SafeUser, UserRole, is_valid_email, is_valid_url};
use keystone_core::UserId;

use crate::app::errors::ApiError;

/// Business-rule checks on a deserialized request body.
pub trait Validate {
    /// Every violated rule, in field order.
    fn violations(&self) -> Vec<String>;
}

pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    result.map(|Json(v)| v).map_err(ApiError::from)
}

pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    let value = extract_json(result)?;
    let violations = value.violations();
    if violations.is_empty() {
        Ok(value)
    } else {
        Err(ApiError::Validation(violations))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn check_email(email: &Option<String>, out: &mut Vec<String>) {
    match email.as_deref() {
        None | Some("") => out.push("Email is required".to_string()),
        Some(e) if !is_valid_email(e) => {
            out.push("Please provide a valid email address".to_string())
        }
        Some(_) => {}
    }
}

fn check_new_password(password: &Option<String>, out: &mut Vec<String>) {
    let Some(password) = password.as_deref() else {
        out.push("Password is required".to_string());
        return;
    };
    if let Err(mut violations) = PasswordPolicy::default().validate(password) {
        out.append(&mut violations);
    }
}

fn check_image(image: &Option<String>, out: &mut Vec<String>) {
    if let Some(image) = image.as_deref() {
        if !is_valid_url(image) {
            out.push("Image must be a valid URL".to_string());
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    /// Accepted for client compatibility; self-registration always yields `USER`.
    pub role: Option<UserRole>,
}

impl Validate for RegisterRequest {
    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        check_email(&self.email, &mut out);
        check_new_password(&self.password, &mut out);
        if self.name.is_some() && is_blank(&self.name) {
            out.push("Name cannot be empty".to_string());
        }
        check_image(&self.image, &mut out);
        out
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Validate for LoginRequest {
    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if is_blank(&self.email) {
            out.push("Email is required".to_string());
        }
        if self.password.as_deref().is_none_or(str::is_empty) {
            out.push("Password is required".to_string());
        }
        out
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

impl Validate for ForgotPasswordRequest {
    fn violations(&self) -> Vec<String> {
        if is_blank(&self.email) {
            vec!["Email is required".to_string()]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ValidateResetTokenQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

impl Validate for ResetPasswordRequest {
    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if is_blank(&self.token) {
            out.push("Token is required".to_string());
        }
        check_new_password(&self.password, &mut out);
        out
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub image: Option<String>,
}

impl Validate for CreateUserRequest {
    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        check_email(&self.email, &mut out);
        check_new_password(&self.password, &mut out);
        check_image(&self.image, &mut out);
        out
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
    pub role: Option<UserRole>,
    pub image: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(email) = self.email.as_deref() {
            if !is_valid_email(email) {
                out.push("Please provide a valid email address".to_string());
            }
        }
        if self.password.is_some() {
            check_new_password(&self.password, &mut out);
        }
        if self.name.is_some() && is_blank(&self.name) {
            out.push("Name cannot be empty".to_string());
        }
        check_image(&self.image, &mut out);
        out
    }
}

/// `?page=&limit=`; non-numeric values fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListUsersQuery {
    pub fn page(&self) -> Option<i64> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit.as_deref().and_then(|l| l.trim().parse().ok())
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: SafeUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The subset of a user exposed to the browser session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub role: UserRole,
}

impl From<&SafeUser> for SessionUser {
    fn from(user: &SafeUser) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub is_authenticated: bool,
    pub user: Option<SessionUser>,
}
