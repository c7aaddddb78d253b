use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::instrument;

use siges_auth::{Action, EntityKind, Target};
use siges_core::AppError;
use siges_models::UserId;

use crate::middleware::auth::CurrentPrincipal;
use crate::modules::users::model::{
    CreateUserDto, RegisterUserDto, ReplaceUserDto, UpdateUserDto, User,
};
use crate::modules::users::service::UserService;
use crate::state::AppState;
use crate::utils::auth_helpers::ensure;
use crate::validator::{Path, ValidatedJson};

#[utoipa::path(
    post,
    path = "/api/users/register/",
    request_body = RegisterUserDto,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input, mismatched passwords or email taken")
    ),
    tag = "Users"
)]
#[instrument(skip(state, dto))]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<RegisterUserDto>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = UserService::register_user(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/me/",
    responses(
        (status = 200, description = "Profile of the authenticated account", body = User),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn get_current_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<User>, AppError> {
    let user = UserService::get_profile(&state.db, principal.id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/users/",
    responses(
        (status = 200, description = "Accounts in the caller's scope, ordered by email", body = Vec<User>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<User>>, AppError> {
    ensure(&principal, Action::List, EntityKind::User, Target::Collection)?;

    let users = UserService::list_users(&state.db, &principal).await?;
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/api/users/",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input, unknown school or email taken"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - super-admin only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<User>), AppError> {
    ensure(&principal, Action::Create, EntityKind::User, Target::Collection)?;

    let user = UserService::create_user(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account details", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found or outside the caller's scope")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    ensure(&principal, Action::Retrieve, EntityKind::User, Target::Collection)?;

    let user = UserService::get_user(&state.db, &principal, id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/",
    params(("id" = UserId, Path, description = "User ID")),
    request_body = ReplaceUserDto,
    responses(
        (status = 200, description = "Account replaced", body = User),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - super-admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn replace_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<ReplaceUserDto>,
) -> Result<Json<User>, AppError> {
    ensure(&principal, Action::Update, EntityKind::User, Target::Collection)?;

    let user =
        UserService::update_user(&state.db, &principal, id, Action::Update, dto.into()).await?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/",
    params(("id" = UserId, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - super-admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<User>, AppError> {
    ensure(&principal, Action::PartialUpdate, EntityKind::User, Target::Collection)?;

    let user =
        UserService::update_user(&state.db, &principal, id, Action::PartialUpdate, dto).await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - super-admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    ensure(&principal, Action::Destroy, EntityKind::User, Target::Collection)?;

    UserService::delete_user(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
