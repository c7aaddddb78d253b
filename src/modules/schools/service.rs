use anyhow::anyhow;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, info, instrument, warn};

use siges_auth::{Action, EntityKind, Principal, RowAncestry, Target};
use siges_core::AppError;
use siges_models::{Role, SchoolId, UserId};

use crate::modules::schools::model::{CreateSchoolDto, School, UpdateSchoolDto};
use crate::utils::auth_helpers::{ensure, lock_directed_schools};
use crate::utils::db_errors::is_foreign_key_violation;

const SCHOOL_COLUMNS: &str = "sc.id, sc.name, sc.address, sc.contact_info, sc.director_id, \
     sc.logo_url, sc.is_active, sc.created_at, sc.updated_at";

const STUDENTS_REMAIN: &str =
    "Cannot delete this school: some of its classes still have enrolled students.";

pub struct SchoolService;

impl SchoolService {
    #[instrument(skip(db, dto), fields(school.name = %dto.name, db.operation = "INSERT", db.table = "schools"))]
    pub async fn create_school(db: &PgPool, dto: CreateSchoolDto) -> Result<School, AppError> {
        debug!(school.name = %dto.name, school.director = ?dto.director, "Creating school");

        let mut tx = db.begin().await?;

        if let Some(director) = dto.director {
            check_director(&mut tx, director).await?;
        }

        let query = format!(
            "INSERT INTO schools AS sc (name, address, contact_info, director_id, logo_url, is_active)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SCHOOL_COLUMNS}"
        );
        let school = sqlx::query_as::<_, School>(&query)
            .bind(&dto.name)
            .bind(&dto.address)
            .bind(&dto.contact_info)
            .bind(dto.director)
            .bind(&dto.logo_url)
            .bind(dto.is_active.unwrap_or(true))
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, school.name = %dto.name, "Database error creating school");
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(school.id = %school.id, school.name = %school.name, "School created");

        Ok(school)
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn list_schools(db: &PgPool) -> Result<Vec<School>, AppError> {
        let query = format!("SELECT {SCHOOL_COLUMNS} FROM schools sc ORDER BY sc.name, sc.id");
        let schools = sqlx::query_as::<_, School>(&query).fetch_all(db).await?;

        debug!(count = schools.len(), "Fetched schools");

        Ok(schools)
    }

    #[instrument(skip(db), fields(school.id = %school_id, db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_school(db: &PgPool, school_id: SchoolId) -> Result<School, AppError> {
        let query = format!("SELECT {SCHOOL_COLUMNS} FROM schools sc WHERE sc.id = $1");
        sqlx::query_as::<_, School>(&query)
            .bind(school_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("School not found")))
    }

    /// Applies `dto` to one school.
    ///
    /// Only a super-admin may change the director; anyone else naming a
    /// different director is refused even when they direct the school.
    #[instrument(skip(db, principal, dto), fields(school.id = %school_id, user.id = %principal.id, db.operation = "UPDATE", db.table = "schools"))]
    pub async fn update_school(
        db: &PgPool,
        principal: &Principal,
        school_id: SchoolId,
        action: Action,
        dto: UpdateSchoolDto,
    ) -> Result<School, AppError> {
        let mut tx = db.begin().await?;
        let principal = &lock_directed_schools(&mut tx, principal).await?;

        let current = lock_school(&mut tx, school_id).await?;
        ensure(
            principal,
            action,
            EntityKind::School,
            Target::Row(&RowAncestry::school(current.id, current.director)),
        )?;

        let director = match dto.director {
            Some(requested) if requested != current.director => {
                if !principal.is_super_admin() {
                    warn!(
                        user.id = %principal.id,
                        school.id = %school_id,
                        "Non super-admin attempted to reassign a school director"
                    );
                    return Err(AppError::forbidden(
                        "Only a super-admin can change the director of a school.",
                    ));
                }
                if let Some(director) = requested {
                    check_director(&mut tx, director).await?;
                }
                requested
            }
            _ => current.director,
        };

        let query = format!(
            "UPDATE schools AS sc
             SET name = $1, address = $2, contact_info = $3, director_id = $4,
                 logo_url = $5, is_active = $6, updated_at = NOW()
             WHERE sc.id = $7
             RETURNING {SCHOOL_COLUMNS}"
        );
        let school = sqlx::query_as::<_, School>(&query)
            .bind(dto.name.unwrap_or(current.name))
            .bind(dto.address.unwrap_or(current.address))
            .bind(dto.contact_info.unwrap_or(current.contact_info))
            .bind(director)
            .bind(dto.logo_url.unwrap_or(current.logo_url))
            .bind(dto.is_active.unwrap_or(current.is_active))
            .bind(school_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(school.id = %school.id, school.director = ?school.director, "School updated");

        Ok(school)
    }

    /// Deletes a school with its levels and classes. Refused while any of
    /// those classes has a student.
    #[instrument(skip(db, principal), fields(school.id = %school_id, user.id = %principal.id, db.operation = "DELETE", db.table = "schools"))]
    pub async fn delete_school(
        db: &PgPool,
        principal: &Principal,
        school_id: SchoolId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        let principal = &lock_directed_schools(&mut tx, principal).await?;

        let current = lock_school(&mut tx, school_id).await?;
        ensure(
            principal,
            Action::Destroy,
            EntityKind::School,
            Target::Row(&RowAncestry::school(current.id, current.director)),
        )?;

        let enrolled: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (
                   SELECT 1 FROM students s
                   JOIN classes c ON c.id = s.school_class_id
                   JOIN levels l ON l.id = c.level_id
                   WHERE l.school_id = $1
               )"#,
        )
        .bind(school_id)
        .fetch_one(&mut *tx)
        .await?;

        if enrolled {
            warn!(school.id = %school_id, "Refusing to delete school with enrolled students");
            return Err(AppError::referential_constraint(STUDENTS_REMAIN));
        }

        sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(school_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::referential_constraint(STUDENTS_REMAIN);
                }
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(school.id = %school_id, "School deleted");

        Ok(())
    }
}

async fn lock_school(
    tx: &mut Transaction<'_, Postgres>,
    school_id: SchoolId,
) -> Result<School, AppError> {
    let query = format!("SELECT {SCHOOL_COLUMNS} FROM schools sc WHERE sc.id = $1 FOR UPDATE");
    sqlx::query_as::<_, School>(&query)
        .bind(school_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("School not found")))
}

/// A school's director must be an existing account with role `director`.
async fn check_director(
    tx: &mut Transaction<'_, Postgres>,
    director: UserId,
) -> Result<(), AppError> {
    let role: Option<Role> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(director)
        .fetch_optional(&mut **tx)
        .await?;

    match role {
        Some(Role::Director) => Ok(()),
        Some(role) => {
            debug!(user.id = %director, user.role = %role, "Rejected director candidate");
            Err(AppError::field(
                "director",
                "The selected user must have the director role.",
            ))
        }
        None => Err(AppError::field(
            "director",
            format!("Invalid pk \"{}\" - object does not exist.", director),
        )),
    }
}
