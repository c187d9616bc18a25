//! Bearer-token auth endpoints and password reset.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Extension, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use keystone_auth::SafeUser;

use crate::app::dto::{
    self, ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, ProfileResponse,
    RegisterRequest, ResetPasswordRequest, ValidateResetTokenQuery,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::app::services::auth::{PASSWORD_RESET_DONE, RESET_REQUESTED};
use crate::context::PrincipalContext;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SafeUser>), ApiError> {
    let req = dto::extract_validated_json(body)?;
    let user = services.register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let req = dto::extract_validated_json(body)?;
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let res = services.login(email.trim(), &password).await?;
    Ok(Json(res))
}

pub async fn profile(Extension(principal): Extension<PrincipalContext>) -> Json<ProfileResponse> {
    let p = principal.principal();
    Json(ProfileResponse {
        user_id: p.user_id,
        email: p.email.clone(),
        role: p.role,
    })
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = dto::extract_validated_json(body)?;
    let email = req.email.unwrap_or_default();

    services.forgot_password(email.trim()).await?;
    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

pub async fn validate_reset_token(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<ValidateResetTokenQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "valid": false, "error": "Token is required" })),
        )
            .into_response());
    };

    let valid = services.validate_reset_token(&token).await?;
    Ok(Json(json!({ "valid": valid })).into_response())
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = dto::extract_validated_json(body)?;
    let token = req.token.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    services.reset_password(&token, &password).await?;
    Ok(Json(MessageResponse::new(PASSWORD_RESET_DONE)))
}
