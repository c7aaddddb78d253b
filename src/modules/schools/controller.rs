use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::instrument;

use siges_auth::{Action, EntityKind, Target};
use siges_core::AppError;
use siges_models::SchoolId;

use crate::middleware::auth::CurrentPrincipal;
use crate::modules::schools::model::{CreateSchoolDto, School, UpdateSchoolDto};
use crate::modules::schools::service::SchoolService;
use crate::state::AppState;
use crate::utils::auth_helpers::ensure;
use crate::validator::{Path, ValidatedJson, reject_field_errors};

#[utoipa::path(
    get,
    path = "/api/schools/",
    responses(
        (status = 200, description = "Every school, ordered by name", body = Vec<School>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn list_schools(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<School>>, AppError> {
    ensure(&principal, Action::List, EntityKind::School, Target::Collection)?;

    let schools = SchoolService::list_schools(&state.db).await?;
    Ok(Json(schools))
}

#[utoipa::path(
    post,
    path = "/api/schools/",
    request_body = CreateSchoolDto,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 400, description = "Invalid input or director without the director role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - super-admin only")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn create_school(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<(StatusCode, Json<School>), AppError> {
    ensure(&principal, Action::Create, EntityKind::School, Target::Collection)?;

    let school = SchoolService::create_school(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    get,
    path = "/api/schools/{id}/",
    params(("id" = SchoolId, Path, description = "School ID")),
    responses(
        (status = 200, description = "School details", body = School),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn get_school(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<SchoolId>,
) -> Result<Json<School>, AppError> {
    ensure(&principal, Action::Retrieve, EntityKind::School, Target::Collection)?;

    let school = SchoolService::get_school(&state.db, id).await?;
    Ok(Json(school))
}

#[utoipa::path(
    put,
    path = "/api/schools/{id}/",
    params(("id" = SchoolId, Path, description = "School ID")),
    request_body = CreateSchoolDto,
    responses(
        (status = 200, description = "School replaced", body = School),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not a director of this school"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn replace_school(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<SchoolId>,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<Json<School>, AppError> {
    ensure(&principal, Action::Update, EntityKind::School, Target::Collection)?;

    let school =
        SchoolService::update_school(&state.db, &principal, id, Action::Update, dto.into())
            .await?;
    Ok(Json(school))
}

#[utoipa::path(
    patch,
    path = "/api/schools/{id}/",
    params(("id" = SchoolId, Path, description = "School ID")),
    request_body = UpdateSchoolDto,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not a director of this school"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn update_school(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<SchoolId>,
    ValidatedJson(dto): ValidatedJson<UpdateSchoolDto>,
) -> Result<Json<School>, AppError> {
    reject_field_errors(dto.nullable_field_errors())?;
    ensure(&principal, Action::PartialUpdate, EntityKind::School, Target::Collection)?;

    let school =
        SchoolService::update_school(&state.db, &principal, id, Action::PartialUpdate, dto)
            .await?;
    Ok(Json(school))
}

#[utoipa::path(
    delete,
    path = "/api/schools/{id}/",
    params(("id" = SchoolId, Path, description = "School ID")),
    responses(
        (status = 204, description = "School deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - not a director of this school"),
        (status = 404, description = "School not found"),
        (status = 409, description = "Some class of this school still has students")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn delete_school(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<SchoolId>,
) -> Result<StatusCode, AppError> {
    ensure(&principal, Action::Destroy, EntityKind::School, Target::Collection)?;

    SchoolService::delete_school(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
