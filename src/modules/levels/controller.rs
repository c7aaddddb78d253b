use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::instrument;

use siges_auth::{Action, EntityKind, Target};
use siges_core::AppError;
use siges_models::{LevelId, SchoolId};

use crate::middleware::auth::CurrentPrincipal;
use crate::modules::levels::model::{CreateLevelDto, Level, UpdateLevelDto};
use crate::modules::levels::service::LevelService;
use crate::state::AppState;
use crate::utils::auth_helpers::ensure;
use crate::validator::{Path, ValidatedJson};

#[utoipa::path(
    get,
    path = "/api/levels/",
    responses(
        (status = 200, description = "Levels in the caller's scope", body = Vec<Level>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn list_levels(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<Level>>, AppError> {
    ensure(&principal, Action::List, EntityKind::Level, Target::Collection)?;

    let levels = LevelService::list_levels(&state.db, &principal, None).await?;
    Ok(Json(levels))
}

#[utoipa::path(
    post,
    path = "/api/levels/",
    request_body = CreateLevelDto,
    responses(
        (status = 201, description = "Level created", body = Level),
        (status = 400, description = "Invalid input, or school omitted while it cannot be inferred"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - school not directed by the caller")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn create_level(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidatedJson(dto): ValidatedJson<CreateLevelDto>,
) -> Result<(StatusCode, Json<Level>), AppError> {
    ensure(&principal, Action::Create, EntityKind::Level, Target::Collection)?;

    let requested_school = dto.school;
    let level = LevelService::create_level(&state.db, &principal, requested_school, dto).await?;
    Ok((StatusCode::CREATED, Json(level)))
}

#[utoipa::path(
    get,
    path = "/api/levels/{id}/",
    params(("id" = LevelId, Path, description = "Level ID")),
    responses(
        (status = 200, description = "Level details", body = Level),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Level not found or outside the caller's scope")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn get_level(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<LevelId>,
) -> Result<Json<Level>, AppError> {
    ensure(&principal, Action::Retrieve, EntityKind::Level, Target::Collection)?;

    let level = LevelService::get_level(&state.db, &principal, id).await?;
    Ok(Json(level))
}

#[utoipa::path(
    put,
    path = "/api/levels/{id}/",
    params(("id" = LevelId, Path, description = "Level ID")),
    request_body = CreateLevelDto,
    responses(
        (status = 200, description = "Level replaced", body = Level),
        (status = 400, description = "Invalid input or attempt to move the level"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Level not found or outside the caller's scope")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn replace_level(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<LevelId>,
    ValidatedJson(dto): ValidatedJson<CreateLevelDto>,
) -> Result<Json<Level>, AppError> {
    ensure(&principal, Action::Update, EntityKind::Level, Target::Collection)?;

    let requested_school = dto.school;
    let level = LevelService::update_level(
        &state.db,
        &principal,
        id,
        Action::Update,
        dto.into(),
        requested_school,
    )
    .await?;
    Ok(Json(level))
}

#[utoipa::path(
    patch,
    path = "/api/levels/{id}/",
    params(("id" = LevelId, Path, description = "Level ID")),
    request_body = UpdateLevelDto,
    responses(
        (status = 200, description = "Level updated", body = Level),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Level not found or outside the caller's scope")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn update_level(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<LevelId>,
    ValidatedJson(dto): ValidatedJson<UpdateLevelDto>,
) -> Result<Json<Level>, AppError> {
    ensure(&principal, Action::PartialUpdate, EntityKind::Level, Target::Collection)?;

    let level =
        LevelService::update_level(&state.db, &principal, id, Action::PartialUpdate, dto, None)
            .await?;
    Ok(Json(level))
}

#[utoipa::path(
    delete,
    path = "/api/levels/{id}/",
    params(("id" = LevelId, Path, description = "Level ID")),
    responses(
        (status = 204, description = "Level deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Level not found or outside the caller's scope"),
        (status = 409, description = "Some class of this level still has students")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn delete_level(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<LevelId>,
) -> Result<StatusCode, AppError> {
    ensure(&principal, Action::Destroy, EntityKind::Level, Target::Collection)?;

    LevelService::delete_level(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/schools/{id}/levels/",
    params(("id" = SchoolId, Path, description = "School ID")),
    responses(
        (status = 200, description = "Levels of this school in the caller's scope", body = Vec<Level>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn list_school_levels(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(school_id): Path<SchoolId>,
) -> Result<Json<Vec<Level>>, AppError> {
    ensure(&principal, Action::List, EntityKind::Level, Target::Collection)?;

    let levels = LevelService::list_levels(&state.db, &principal, Some(school_id)).await?;
    Ok(Json(levels))
}

#[utoipa::path(
    post,
    path = "/api/schools/{id}/levels/",
    params(("id" = SchoolId, Path, description = "School ID")),
    request_body = CreateLevelDto,
    responses(
        (status = 201, description = "Level created in this school", body = Level),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - school not directed by the caller")
    ),
    tag = "Levels",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn create_school_level(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(school_id): Path<SchoolId>,
    ValidatedJson(dto): ValidatedJson<CreateLevelDto>,
) -> Result<(StatusCode, Json<Level>), AppError> {
    if dto.school.is_some_and(|school| school != school_id) {
        return Err(AppError::field(
            "school",
            "Must match the school in the URL.",
        ));
    }
    ensure(&principal, Action::Create, EntityKind::Level, Target::Collection)?;

    let level = LevelService::create_level(&state.db, &principal, Some(school_id), dto).await?;
    Ok((StatusCode::CREATED, Json(level)))
}
