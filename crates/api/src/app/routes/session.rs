//! Cookie-backed browser sessions.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;

use keystone_infra::Session;

use crate::app::dto::{self, LoginRequest, SessionStatusResponse, SessionUser};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub const SESSION_COOKIE: &str = "keystone.session-token";

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let max_age = time::Duration::seconds(Session::max_age().num_seconds());
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .secure(secure)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = dto::extract_validated_json(body)?;
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let session = services.start_session(email.trim(), &password).await?;
    let cookie = session_cookie(session.session_token, services.config().session_cookie_secure);

    Ok((
        jar.add(cookie),
        Json(json!({ "success": true, "message": "Login successful" })),
    ))
}

pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let user = match jar.get(SESSION_COOKIE) {
        Some(cookie) => services.session_user(cookie.value()).await?,
        None => None,
    };

    Ok(Json(SessionStatusResponse {
        is_authenticated: user.is_some(),
        user: user.as_ref().map(SessionUser::from),
    }))
}

pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        services.end_session(cookie.value()).await?;
    }
    Ok((jar.remove(removal_cookie()), StatusCode::NO_CONTENT))
}

pub async fn protected(
    Extension(services): Extension<Arc<AppServices>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let user = services
        .session_user(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    Ok(Json(json!({
        "message": "This is a protected route",
        "user": SessionUser::from(&user),
    })))
}
