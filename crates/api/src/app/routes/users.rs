use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    routing::get,
};

use keystone_auth::SafeUser;
use keystone_core::{Page, Paginated};

use crate::app::dto::{self, CreateUserRequest, ListUsersQuery, UpdateUserRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::{require_admin, require_member};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(me))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SafeUser>), ApiError> {
    require_admin(&principal)?;
    let req = dto::extract_validated_json(body)?;

    let user = services.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<Paginated<SafeUser>>, ApiError> {
    require_admin(&principal)?;
    let Query(query) = query?;

    let page = Page::clamped(query.page(), query.limit());
    Ok(Json(services.list_users(page).await?))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<SafeUser>, ApiError> {
    require_member(&principal)?;
    Ok(Json(services.current_user(principal.principal()).await?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<SafeUser>, ApiError> {
    require_member(&principal)?;
    Ok(Json(services.get_user(principal.principal(), &id).await?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<SafeUser>, ApiError> {
    require_member(&principal)?;
    let req = dto::extract_validated_json(body)?;

    Ok(Json(services.update_user(principal.principal(), &id, req).await?))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&principal)?;

    services.delete_user(principal.principal(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
