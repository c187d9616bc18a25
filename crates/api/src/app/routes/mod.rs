use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod session;
pub mod system;
pub mod users;

/// Endpoints reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/validate-reset-token", get(auth::validate_reset_token))
        .route("/auth/reset-password", post(auth::reset_password))
        .route(
            "/auth/session",
            get(session::status)
                .post(session::sign_in)
                .delete(session::sign_out),
        )
        .route("/auth/protected", get(session::protected))
}

/// Endpoints behind the bearer middleware.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/profile", get(auth::profile))
        .nest("/users", users::router())
}
