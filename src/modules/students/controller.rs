use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::instrument;

use siges_auth::{Action, EntityKind, Target};
use siges_core::AppError;
use siges_models::StudentId;

use crate::middleware::auth::CurrentPrincipal;
use crate::modules::students::model::{
    CreateStudentDto, Student, StudentFilterParams, UpdateStudentDto,
};
use crate::modules::students::service::StudentService;
use crate::state::AppState;
use crate::utils::auth_helpers::ensure;
use crate::validator::{Path, Query, ValidatedJson, reject_field_errors};

#[utoipa::path(
    get,
    path = "/api/students/",
    params(StudentFilterParams),
    responses(
        (status = 200, description = "Students in the caller's scope, ordered by name", body = Vec<Student>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn list_students(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(filters): Query<StudentFilterParams>,
) -> Result<Json<Vec<Student>>, AppError> {
    ensure(&principal, Action::List, EntityKind::Student, Target::Collection)?;

    let students = StudentService::list_students(&state.db, &principal, filters).await?;
    Ok(Json(students))
}

#[utoipa::path(
    post,
    path = "/api/students/",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Student),
        (status = 400, description = "Invalid input, unknown class or parent"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - class outside the caller's schools")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn create_student(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    ensure(&principal, Action::Create, EntityKind::Student, Target::Collection)?;

    let student = StudentService::create_student(&state.db, &principal, dto).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = Student),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Student not found or outside the caller's scope")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn get_student(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<StudentId>,
) -> Result<Json<Student>, AppError> {
    ensure(&principal, Action::Retrieve, EntityKind::Student, Target::Collection)?;

    let student = StudentService::get_student(&state.db, &principal, id).await?;
    Ok(Json(student))
}

#[utoipa::path(
    put,
    path = "/api/students/{id}/",
    params(("id" = StudentId, Path, description = "Student ID")),
    request_body = CreateStudentDto,
    responses(
        (status = 200, description = "Student replaced", body = Student),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found or outside the caller's scope")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn replace_student(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<Json<Student>, AppError> {
    ensure(&principal, Action::Update, EntityKind::Student, Target::Collection)?;

    let student =
        StudentService::update_student(&state.db, &principal, id, Action::Update, dto.into())
            .await?;
    Ok(Json(student))
}

#[utoipa::path(
    patch,
    path = "/api/students/{id}/",
    params(("id" = StudentId, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated", body = Student),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found or outside the caller's scope")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal, dto))]
pub async fn update_student(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<StudentId>,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<Student>, AppError> {
    reject_field_errors(dto.nullable_field_errors())?;
    ensure(&principal, Action::PartialUpdate, EntityKind::Student, Target::Collection)?;

    let student =
        StudentService::update_student(&state.db, &principal, id, Action::PartialUpdate, dto)
            .await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}/",
    params(("id" = StudentId, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Student not found or outside the caller's scope")
    ),
    tag = "Students",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, principal))]
pub async fn delete_student(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<StudentId>,
) -> Result<StatusCode, AppError> {
    ensure(&principal, Action::Destroy, EntityKind::Student, Target::Collection)?;

    StudentService::delete_student(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
