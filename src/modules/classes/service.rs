use anyhow::anyhow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument, warn};

use siges_auth::{Action, EntityKind, Principal, Scope, reachable};
use siges_core::AppError;
use siges_core::errors::NON_FIELD_ERRORS;
use siges_models::{ClassId, LevelId, SchoolId};

use crate::modules::classes::model::{CreateClassDto, SchoolClass, UpdateClassDto};
use crate::utils::auth_helpers::{ensure_within, lock_directed_schools, school_of_level};
use crate::utils::db_errors::{is_foreign_key_violation, is_unique_violation};
use crate::utils::scope_sql::push_scope_predicate;

const CLASS_COLUMNS: &str =
    "c.id, c.name, c.academic_year, c.level_id, c.created_at, c.updated_at";

const DUPLICATE_CLASS: &str = "The fields name, level, academic_year must make a unique set.";
const STUDENTS_REMAIN: &str = "Cannot delete this class: students are still enrolled in it.";

/// A class together with the school it hangs under.
#[derive(FromRow)]
struct ClassRow {
    #[sqlx(flatten)]
    class: SchoolClass,
    school_id: SchoolId,
}

pub struct ClassService;

impl ClassService {
    /// Creates a class in `level_id` once the level's school is in the
    /// principal's scope.
    #[instrument(skip(db, principal, dto), fields(class.name = %dto.name, level.id = %level_id, db.operation = "INSERT", db.table = "classes"))]
    pub async fn create_class(
        db: &PgPool,
        principal: &Principal,
        level_id: LevelId,
        dto: CreateClassDto,
    ) -> Result<SchoolClass, AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let school = school_of_level(&mut *tx, level_id).await?.ok_or_else(|| {
            AppError::field(
                "level",
                format!("Invalid pk \"{}\" - object does not exist.", level_id),
            )
        })?;
        ensure_within(principal, Action::Create, EntityKind::SchoolClass, Some(school))?;

        let query = format!(
            "INSERT INTO classes AS c (name, academic_year, level_id) VALUES ($1, $2, $3)
             RETURNING {CLASS_COLUMNS}"
        );
        let class = sqlx::query_as::<_, SchoolClass>(&query)
            .bind(&dto.name)
            .bind(&dto.academic_year)
            .bind(level_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    warn!(class.name = %dto.name, level.id = %level_id, "Duplicate class");
                    return AppError::field(NON_FIELD_ERRORS, DUPLICATE_CLASS);
                }
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(class.id = %class.id, level.id = %class.level, school.id = %school, "Class created");

        Ok(class)
    }

    #[instrument(skip(db, principal), fields(user.id = %principal.id, db.operation = "SELECT", db.table = "classes"))]
    pub async fn list_classes(
        db: &PgPool,
        principal: &Principal,
        level_id: Option<LevelId>,
    ) -> Result<Vec<SchoolClass>, AppError> {
        let scope = reachable(principal, EntityKind::SchoolClass);

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CLASS_COLUMNS} FROM classes c JOIN levels l ON l.id = c.level_id WHERE "
        ));
        push_scope_predicate(&mut qb, &scope, EntityKind::SchoolClass);
        if let Some(level_id) = level_id {
            qb.push(" AND c.level_id = ").push_bind(level_id);
        }
        qb.push(" ORDER BY c.name, c.level_id, c.academic_year, c.id");

        let classes = qb.build_query_as::<SchoolClass>().fetch_all(db).await?;

        debug!(count = classes.len(), "Fetched classes");

        Ok(classes)
    }

    #[instrument(skip(db, principal), fields(class.id = %class_id, db.operation = "SELECT", db.table = "classes"))]
    pub async fn get_class(
        db: &PgPool,
        principal: &Principal,
        class_id: ClassId,
    ) -> Result<SchoolClass, AppError> {
        let scope = reachable(principal, EntityKind::SchoolClass);
        let mut qb = scoped_class_query(&scope, class_id);
        qb.build_query_as::<ClassRow>()
            .fetch_optional(db)
            .await?
            .map(|row| row.class)
            .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))
    }

    /// The owning level of a class is fixed; `requested_level` is the level
    /// named by a full replacement, if any.
    #[instrument(skip(db, principal, dto), fields(class.id = %class_id, user.id = %principal.id, db.operation = "UPDATE", db.table = "classes"))]
    pub async fn update_class(
        db: &PgPool,
        principal: &Principal,
        class_id: ClassId,
        action: Action,
        dto: UpdateClassDto,
        requested_level: Option<LevelId>,
    ) -> Result<SchoolClass, AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let ClassRow { class: current, school_id } = lock_class(&mut tx, principal, class_id).await?;
        ensure_within(principal, action, EntityKind::SchoolClass, Some(school_id))?;

        if requested_level.is_some_and(|level| level != current.level) {
            return Err(AppError::field(
                "level",
                "The level of an existing class cannot be changed.",
            ));
        }

        let query = format!(
            "UPDATE classes AS c SET name = $1, academic_year = $2, updated_at = NOW()
             WHERE c.id = $3 RETURNING {CLASS_COLUMNS}"
        );
        let class = sqlx::query_as::<_, SchoolClass>(&query)
            .bind(dto.name.unwrap_or(current.name))
            .bind(dto.academic_year.unwrap_or(current.academic_year))
            .bind(class_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return AppError::field(NON_FIELD_ERRORS, DUPLICATE_CLASS);
                }
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(class.id = %class.id, "Class updated");

        Ok(class)
    }

    /// Deletes an empty class. Students protect their class.
    #[instrument(skip(db, principal), fields(class.id = %class_id, user.id = %principal.id, db.operation = "DELETE", db.table = "classes"))]
    pub async fn delete_class(
        db: &PgPool,
        principal: &Principal,
        class_id: ClassId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let row = lock_class(&mut tx, principal, class_id).await?;
        ensure_within(principal, Action::Destroy, EntityKind::SchoolClass, Some(row.school_id))?;

        let enrolled: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE school_class_id = $1")
                .bind(class_id)
                .fetch_one(&mut *tx)
                .await?;

        if enrolled > 0 {
            warn!(class.id = %class_id, students = enrolled, "Refusing to delete class with students");
            return Err(AppError::referential_constraint(STUDENTS_REMAIN));
        }

        sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(class_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::referential_constraint(STUDENTS_REMAIN);
                }
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(class.id = %class_id, "Class deleted");

        Ok(())
    }
}

fn scoped_class_query(scope: &Scope, class_id: ClassId) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT {CLASS_COLUMNS}, l.school_id FROM classes c JOIN levels l ON l.id = c.level_id WHERE c.id = "
    ));
    qb.push_bind(class_id).push(" AND ");
    push_scope_predicate(&mut qb, scope, EntityKind::SchoolClass);
    qb
}

async fn lock_class(
    tx: &mut Transaction<'_, Postgres>,
    principal: &Principal,
    class_id: ClassId,
) -> Result<ClassRow, AppError> {
    let scope = reachable(principal, EntityKind::SchoolClass);
    let mut qb = scoped_class_query(&scope, class_id);
    qb.push(" FOR UPDATE OF c");
    qb.build_query_as::<ClassRow>()
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))
}
