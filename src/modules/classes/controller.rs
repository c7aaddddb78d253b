use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::instrument;

use siges_auth::{Action, EntityKind, Target};
use siges_core::AppError;
use siges_models::{ClassId, LevelId};

use crate::middleware::auth::CurrentPrincipal;
use crate::modules::classes::model::{CreateClassDto, SchoolClass, UpdateClassDto};
use crate::modules::classes::service::ClassService;
use crate::state::AppState;
use crate::utils::auth_helpers::ensure;
use crate::validator::{Path, ValidatedJson};

#[utoipa::path(
    get,
    path = "/api/classes/",
    responses(
        (status = 200, description = "Classes in the caller's scope", body = Vec<SchoolClass>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn list_classes(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<SchoolClass>>, AppError> {
    ensure(&principal, Action::List, EntityKind::SchoolClass, Target::Collection)?;

    let classes = ClassService::list_classes(&state.db, &principal, None).await?;
    Ok(Json(classes))
}

#[utoipa::path(
    post,
    path = "/api/classes/",
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created", body = SchoolClass),
        (status = 400, description = "Invalid input or missing level"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - level outside the caller's schools")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn create_class(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<(StatusCode, Json<SchoolClass>), AppError> {
    ensure(&principal, Action::Create, EntityKind::SchoolClass, Target::Collection)?;

    let level = dto
        .level
        .ok_or_else(|| AppError::field("level", "This field is required."))?;

    let class = ClassService::create_class(&state.db, &principal, level, dto).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

#[utoipa::path(
    get,
    path = "/api/classes/{id}/",
    params(("id" = ClassId, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class details", body = SchoolClass),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Class not found or outside the caller's scope")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn get_class(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<ClassId>,
) -> Result<Json<SchoolClass>, AppError> {
    ensure(&principal, Action::Retrieve, EntityKind::SchoolClass, Target::Collection)?;

    let class = ClassService::get_class(&state.db, &principal, id).await?;
    Ok(Json(class))
}

#[utoipa::path(
    put,
    path = "/api/classes/{id}/",
    params(("id" = ClassId, Path, description = "Class ID")),
    request_body = CreateClassDto,
    responses(
        (status = 200, description = "Class replaced", body = SchoolClass),
        (status = 400, description = "Invalid input or attempt to move the class"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Class not found or outside the caller's scope")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn replace_class(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<ClassId>,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<Json<SchoolClass>, AppError> {
    ensure(&principal, Action::Update, EntityKind::SchoolClass, Target::Collection)?;

    let requested_level = dto.level;
    let class = ClassService::update_class(
        &state.db,
        &principal,
        id,
        Action::Update,
        dto.into(),
        requested_level,
    )
    .await?;
    Ok(Json(class))
}

#[utoipa::path(
    patch,
    path = "/api/classes/{id}/",
    params(("id" = ClassId, Path, description = "Class ID")),
    request_body = UpdateClassDto,
    responses(
        (status = 200, description = "Class updated", body = SchoolClass),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Class not found or outside the caller's scope")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn update_class(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<ClassId>,
    ValidatedJson(dto): ValidatedJson<UpdateClassDto>,
) -> Result<Json<SchoolClass>, AppError> {
    ensure(&principal, Action::PartialUpdate, EntityKind::SchoolClass, Target::Collection)?;

    let class =
        ClassService::update_class(&state.db, &principal, id, Action::PartialUpdate, dto, None)
            .await?;
    Ok(Json(class))
}

#[utoipa::path(
    delete,
    path = "/api/classes/{id}/",
    params(("id" = ClassId, Path, description = "Class ID")),
    responses(
        (status = 204, description = "Class deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Class not found or outside the caller's scope"),
        (status = 409, description = "Students are still enrolled in the class")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn delete_class(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<ClassId>,
) -> Result<StatusCode, AppError> {
    ensure(&principal, Action::Destroy, EntityKind::SchoolClass, Target::Collection)?;

    ClassService::delete_class(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/levels/{id}/classes/",
    params(("id" = LevelId, Path, description = "Level ID")),
    responses(
        (status = 200, description = "Classes of this level in the caller's scope", body = Vec<SchoolClass>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn list_level_classes(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(level_id): Path<LevelId>,
) -> Result<Json<Vec<SchoolClass>>, AppError> {
    ensure(&principal, Action::List, EntityKind::SchoolClass, Target::Collection)?;

    let classes = ClassService::list_classes(&state.db, &principal, Some(level_id)).await?;
    Ok(Json(classes))
}

#[utoipa::path(
    post,
    path = "/api/levels/{id}/classes/",
    params(("id" = LevelId, Path, description = "Level ID")),
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created in this level", body = SchoolClass),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - level outside the caller's schools")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn create_level_class(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(level_id): Path<LevelId>,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<(StatusCode, Json<SchoolClass>), AppError> {
    ensure(&principal, Action::Create, EntityKind::SchoolClass, Target::Collection)?;

    if dto.level.is_some_and(|level| level != level_id) {
        return Err(AppError::field("level", "Must match the level in the URL."));
    }

    let class = ClassService::create_class(&state.db, &principal, level_id, dto).await?;
    Ok((StatusCode::CREATED, Json(class)))
}
