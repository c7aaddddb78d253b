use std::collections::BTreeSet;

use anyhow::anyhow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument, warn};

use siges_auth::{Action, EntityKind, Principal, RowAncestry, Scope, Target, reachable};
use siges_core::AppError;
use siges_core::errors::FieldErrors;
use siges_models::{ClassId, Role, SchoolId, StudentId, UserId};

use crate::modules::students::model::{
    CreateStudentDto, Student, StudentFilter, StudentFilterParams, UpdateStudentDto,
};
use crate::utils::auth_helpers::{ensure, ensure_within, lock_directed_schools, school_of_class};
use crate::utils::scope_sql::push_scope_predicate;

const STUDENT_SELECT: &str = r#"SELECT s.id, s.first_name, s.last_name, s.date_of_birth, s.gender,
       s.address, s.emergency_contact_name, s.emergency_contact_phone, s.photo_url,
       s.school_class_id,
       ARRAY(SELECT sp.parent_id FROM student_parents sp
             WHERE sp.student_id = s.id ORDER BY sp.parent_id) AS parents,
       s.enrollment_date, s.status, s.created_at, s.updated_at,
       l.school_id
FROM students s
JOIN classes c ON c.id = s.school_class_id
JOIN levels l ON l.id = c.level_id"#;

#[derive(FromRow)]
struct StudentRow {
    #[sqlx(flatten)]
    student: Student,
    school_id: SchoolId,
}

impl StudentRow {
    fn ancestry(&self) -> RowAncestry {
        RowAncestry::student(Some(self.school_id), self.student.parents.clone())
    }
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, principal, dto), fields(user.id = %principal.id, class.id = %dto.school_class, db.operation = "INSERT", db.table = "students"))]
    pub async fn create_student(
        db: &PgPool,
        principal: &Principal,
        dto: CreateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let school = class_school(&mut tx, dto.school_class).await?;
        ensure_within(principal, Action::Create, EntityKind::Student, Some(school))?;

        let parents = check_parents(&mut tx, dto.parents.as_deref().unwrap_or_default()).await?;

        let student_id: StudentId = sqlx::query_scalar(
            r#"INSERT INTO students (
                   first_name, last_name, date_of_birth, gender, address,
                   emergency_contact_name, emergency_contact_phone, photo_url,
                   school_class_id, status
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id"#,
        )
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.date_of_birth)
        .bind(dto.gender)
        .bind(&dto.address)
        .bind(&dto.emergency_contact_name)
        .bind(&dto.emergency_contact_phone)
        .bind(&dto.photo_url)
        .bind(dto.school_class)
        .bind(dto.status.unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

        link_parents(&mut tx, student_id, &parents).await?;

        let student = reload_student(&mut tx, student_id).await?;
        tx.commit().await?;

        info!(
            student.id = %student.id,
            class.id = %student.school_class,
            parents = student.parents.len(),
            "Student enrolled"
        );

        Ok(student)
    }

    /// Students visible to `principal`, ordered by name.
    ///
    /// The filters only narrow a super-admin's listing; everyone else always
    /// gets their full scope.
    #[instrument(skip(db, principal), fields(user.id = %principal.id, db.operation = "SELECT", db.table = "students"))]
    pub async fn list_students(
        db: &PgPool,
        principal: &Principal,
        filters: StudentFilterParams,
    ) -> Result<Vec<Student>, AppError> {
        let scope = reachable(principal, EntityKind::Student);

        let mut qb = QueryBuilder::<Postgres>::new(STUDENT_SELECT);
        qb.push(" WHERE ");
        push_scope_predicate(&mut qb, &scope, EntityKind::Student);

        if scope.is_unrestricted() {
            match filters.resolve().map_err(malformed_filters)? {
                Some(StudentFilter::Class(class_id)) => {
                    qb.push(" AND s.school_class_id = ").push_bind(class_id);
                }
                Some(StudentFilter::Level(level_id)) => {
                    qb.push(" AND c.level_id = ").push_bind(level_id);
                }
                Some(StudentFilter::School(school_id)) => {
                    qb.push(" AND l.school_id = ").push_bind(school_id);
                }
                None => {}
            }
        } else if filters.class_id.is_some()
            || filters.level_id.is_some()
            || filters.school_id.is_some()
        {
            debug!(user.role = %principal.role, "Ignoring student filters outside super-admin scope");
        }

        qb.push(" ORDER BY s.last_name, s.first_name, s.id");

        let students: Vec<Student> = qb
            .build_query_as::<StudentRow>()
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|row| row.student)
            .collect();

        debug!(count = students.len(), "Fetched students");

        Ok(students)
    }

    #[instrument(skip(db, principal), fields(student.id = %student_id, db.operation = "SELECT", db.table = "students"))]
    pub async fn get_student(
        db: &PgPool,
        principal: &Principal,
        student_id: StudentId,
    ) -> Result<Student, AppError> {
        let scope = reachable(principal, EntityKind::Student);
        let mut qb = scoped_student_query(&scope, student_id);
        qb.build_query_as::<StudentRow>()
            .fetch_optional(db)
            .await?
            .map(|row| row.student)
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    /// Applies `dto`. `enrollment_date` is never written; moving the student
    /// to another class re-checks the scope against that class's school.
    #[instrument(skip(db, principal, dto), fields(student.id = %student_id, user.id = %principal.id, db.operation = "UPDATE", db.table = "students"))]
    pub async fn update_student(
        db: &PgPool,
        principal: &Principal,
        student_id: StudentId,
        action: Action,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let row = lock_student(&mut tx, principal, student_id).await?;
        ensure(principal, action, EntityKind::Student, Target::Row(&row.ancestry()))?;
        let current = row.student;

        let school_class = match dto.school_class {
            Some(class_id) if class_id != current.school_class => {
                let school = class_school(&mut tx, class_id).await?;
                ensure_within(principal, action, EntityKind::Student, Some(school))?;
                debug!(class.from = %current.school_class, class.to = %class_id, "Moving student");
                class_id
            }
            _ => current.school_class,
        };

        let parents = match &dto.parents {
            Some(parents) => Some(check_parents(&mut tx, parents).await?),
            None => None,
        };

        sqlx::query(
            r#"UPDATE students
               SET first_name = $1, last_name = $2, date_of_birth = $3, gender = $4,
                   address = $5, emergency_contact_name = $6, emergency_contact_phone = $7,
                   photo_url = $8, school_class_id = $9, status = $10, updated_at = NOW()
               WHERE id = $11"#,
        )
        .bind(dto.first_name.unwrap_or(current.first_name))
        .bind(dto.last_name.unwrap_or(current.last_name))
        .bind(dto.date_of_birth.unwrap_or(current.date_of_birth))
        .bind(dto.gender.unwrap_or(current.gender))
        .bind(dto.address.unwrap_or(current.address))
        .bind(dto.emergency_contact_name.unwrap_or(current.emergency_contact_name))
        .bind(dto.emergency_contact_phone.unwrap_or(current.emergency_contact_phone))
        .bind(dto.photo_url.unwrap_or(current.photo_url))
        .bind(school_class)
        .bind(dto.status.unwrap_or(current.status))
        .bind(student_id)
        .execute(&mut *tx)
        .await?;

        if let Some(parents) = parents {
            sqlx::query("DELETE FROM student_parents WHERE student_id = $1")
                .bind(student_id)
                .execute(&mut *tx)
                .await?;
            link_parents(&mut tx, student_id, &parents).await?;
        }

        let student = reload_student(&mut tx, student_id).await?;
        tx.commit().await?;

        info!(student.id = %student.id, "Student updated");

        Ok(student)
    }

    #[instrument(skip(db, principal), fields(student.id = %student_id, user.id = %principal.id, db.operation = "DELETE", db.table = "students"))]
    pub async fn delete_student(
        db: &PgPool,
        principal: &Principal,
        student_id: StudentId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let row = lock_student(&mut tx, principal, student_id).await?;
        ensure(principal, Action::Destroy, EntityKind::Student, Target::Row(&row.ancestry()))?;

        sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(student_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(student.id = %student_id, "Student deleted");

        Ok(())
    }
}

fn scoped_student_query(scope: &Scope, student_id: StudentId) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(STUDENT_SELECT);
    qb.push(" WHERE s.id = ").push_bind(student_id).push(" AND ");
    push_scope_predicate(&mut qb, scope, EntityKind::Student);
    qb
}

async fn lock_student(
    tx: &mut Transaction<'_, Postgres>,
    principal: &Principal,
    student_id: StudentId,
) -> Result<StudentRow, AppError> {
    let scope = reachable(principal, EntityKind::Student);
    let mut qb = scoped_student_query(&scope, student_id);
    qb.push(" FOR UPDATE OF s");
    qb.build_query_as::<StudentRow>()
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
}

async fn reload_student(
    tx: &mut Transaction<'_, Postgres>,
    student_id: StudentId,
) -> Result<Student, AppError> {
    let query = format!("{STUDENT_SELECT} WHERE s.id = $1");
    let row = sqlx::query_as::<_, StudentRow>(&query)
        .bind(student_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.student)
}

async fn class_school(
    tx: &mut Transaction<'_, Postgres>,
    class_id: ClassId,
) -> Result<SchoolId, AppError> {
    school_of_class(&mut **tx, class_id).await?.ok_or_else(|| {
        AppError::field(
            "school_class",
            format!("Invalid pk \"{}\" - object does not exist.", class_id),
        )
    })
}

fn malformed_filters(fields: Vec<&'static str>) -> AppError {
    let mut errors = FieldErrors::new();
    for field in fields {
        errors.insert(field.to_string(), vec!["Must be a valid UUID.".to_string()]);
    }
    AppError::validation(errors)
}

/// Every linked account must exist and have role `parent`. Returns the
/// de-duplicated set.
async fn check_parents(
    tx: &mut Transaction<'_, Postgres>,
    parents: &[UserId],
) -> Result<Vec<UserId>, AppError> {
    let requested: BTreeSet<UserId> = parents.iter().copied().collect();
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<UserId> = requested.iter().copied().collect();
    let found: Vec<(UserId, Role)> =
        sqlx::query_as("SELECT id, role FROM users WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut **tx)
            .await?;

    let mut messages = Vec::new();
    for id in &ids {
        match found.iter().find(|(found_id, _)| found_id == id) {
            None => messages.push(format!("Invalid pk \"{}\" - object does not exist.", id)),
            Some((_, Role::Parent)) => {}
            Some((_, role)) => {
                warn!(user.id = %id, user.role = %role, "Rejected parent link");
                messages.push(format!("User {} must have the parent role.", id));
            }
        }
    }

    if !messages.is_empty() {
        let mut fields = FieldErrors::new();
        fields.insert("parents".to_string(), messages);
        return Err(AppError::validation(fields));
    }

    Ok(ids)
}

async fn link_parents(
    tx: &mut Transaction<'_, Postgres>,
    student_id: StudentId,
    parents: &[UserId],
) -> Result<(), AppError> {
    if parents.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO student_parents (student_id, parent_id) SELECT $1, UNNEST($2::uuid[])",
    )
    .bind(student_id)
    .bind(parents)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
