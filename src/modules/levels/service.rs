use anyhow::anyhow;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, info, instrument, warn};

use siges_auth::{Action, Deny, EntityKind, Principal, Scope, reachable, resolve_level_school};
use siges_core::AppError;
use siges_core::errors::NON_FIELD_ERRORS;
use siges_models::{LevelId, SchoolId};

use crate::modules::levels::model::{CreateLevelDto, Level, UpdateLevelDto};
use crate::utils::auth_helpers::{ensure_within, lock_directed_schools};
use crate::utils::db_errors::{is_foreign_key_violation, is_unique_violation};
use crate::utils::scope_sql::push_scope_predicate;

const LEVEL_COLUMNS: &str = "l.id, l.name, l.cycle, l.school_id, l.created_at, l.updated_at";

const DUPLICATE_LEVEL: &str = "The fields name, school must make a unique set.";
const STUDENTS_REMAIN: &str =
    "Cannot delete this level: some of its classes still have enrolled students.";

pub struct LevelService;

impl LevelService {
    /// Inserts a level under the requested school, or under the caller's only
    /// directed school when none is named.
    #[instrument(skip(db, principal, dto), fields(level.name = %dto.name, user.id = %principal.id, db.operation = "INSERT", db.table = "levels"))]
    pub async fn create_level(
        db: &PgPool,
        principal: &Principal,
        requested_school: Option<SchoolId>,
        dto: CreateLevelDto,
    ) -> Result<Level, AppError> {
        let mut tx = db.begin().await?;

        let principal = lock_directed_schools(&mut tx, principal).await?;
        let school_id =
            resolve_level_school(&principal, requested_school).map_err(Deny::into_app_error)?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM schools WHERE id = $1)")
            .bind(school_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::field(
                "school",
                format!("Invalid pk \"{}\" - object does not exist.", school_id),
            ));
        }

        let query = format!(
            "INSERT INTO levels AS l (name, cycle, school_id) VALUES ($1, $2, $3) RETURNING {LEVEL_COLUMNS}"
        );
        let level = sqlx::query_as::<_, Level>(&query)
            .bind(&dto.name)
            .bind(dto.cycle)
            .bind(school_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    warn!(level.name = %dto.name, school.id = %school_id, "Duplicate level name");
                    return AppError::field(NON_FIELD_ERRORS, DUPLICATE_LEVEL);
                }
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(level.id = %level.id, school.id = %level.school, "Level created");

        Ok(level)
    }

    /// Levels visible to `principal`, optionally narrowed to one school.
    #[instrument(skip(db, principal), fields(user.id = %principal.id, db.operation = "SELECT", db.table = "levels"))]
    pub async fn list_levels(
        db: &PgPool,
        principal: &Principal,
        school_id: Option<SchoolId>,
    ) -> Result<Vec<Level>, AppError> {
        let scope = reachable(principal, EntityKind::Level);

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {LEVEL_COLUMNS} FROM levels l WHERE "));
        push_scope_predicate(&mut qb, &scope, EntityKind::Level);
        if let Some(school_id) = school_id {
            qb.push(" AND l.school_id = ").push_bind(school_id);
        }
        qb.push(" ORDER BY l.name, l.school_id, l.id");

        let levels = qb.build_query_as::<Level>().fetch_all(db).await?;

        debug!(count = levels.len(), "Fetched levels");

        Ok(levels)
    }

    #[instrument(skip(db, principal), fields(level.id = %level_id, db.operation = "SELECT", db.table = "levels"))]
    pub async fn get_level(
        db: &PgPool,
        principal: &Principal,
        level_id: LevelId,
    ) -> Result<Level, AppError> {
        let scope = reachable(principal, EntityKind::Level);
        let mut qb = scoped_level_query(&scope, level_id);
        qb.build_query_as::<Level>()
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Level not found")))
    }

    /// Renames or re-cycles a level. The owning school never changes;
    /// `requested_school` is the school named by a full replacement, if any.
    #[instrument(skip(db, principal, dto), fields(level.id = %level_id, user.id = %principal.id, db.operation = "UPDATE", db.table = "levels"))]
    pub async fn update_level(
        db: &PgPool,
        principal: &Principal,
        level_id: LevelId,
        action: Action,
        dto: UpdateLevelDto,
        requested_school: Option<SchoolId>,
    ) -> Result<Level, AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let current = lock_level(&mut tx, principal, level_id).await?;
        ensure_within(principal, action, EntityKind::Level, Some(current.school))?;

        if requested_school.is_some_and(|school| school != current.school) {
            return Err(AppError::field(
                "school",
                "The school of an existing level cannot be changed.",
            ));
        }

        let query = format!(
            "UPDATE levels AS l SET name = $1, cycle = $2, updated_at = NOW()
             WHERE l.id = $3 RETURNING {LEVEL_COLUMNS}"
        );
        let level = sqlx::query_as::<_, Level>(&query)
            .bind(dto.name.unwrap_or(current.name))
            .bind(dto.cycle.unwrap_or(current.cycle))
            .bind(level_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    return AppError::field(NON_FIELD_ERRORS, DUPLICATE_LEVEL);
                }
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(level.id = %level.id, "Level updated");

        Ok(level)
    }

    #[instrument(skip(db, principal), fields(level.id = %level_id, user.id = %principal.id, db.operation = "DELETE", db.table = "levels"))]
    pub async fn delete_level(
        db: &PgPool,
        principal: &Principal,
        level_id: LevelId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let principal = &lock_directed_schools(&mut tx, principal).await?;
        let current = lock_level(&mut tx, principal, level_id).await?;
        ensure_within(principal, Action::Destroy, EntityKind::Level, Some(current.school))?;

        let enrolled: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (
                   SELECT 1 FROM students s
                   JOIN classes c ON c.id = s.school_class_id
                   WHERE c.level_id = $1
               )"#,
        )
        .bind(level_id)
        .fetch_one(&mut *tx)
        .await?;

        if enrolled {
            warn!(level.id = %level_id, "Refusing to delete level with enrolled students");
            return Err(AppError::referential_constraint(STUDENTS_REMAIN));
        }

        sqlx::query("DELETE FROM levels WHERE id = $1")
            .bind(level_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::referential_constraint(STUDENTS_REMAIN);
                }
                AppError::from(e)
            })?;

        tx.commit().await?;

        info!(level.id = %level_id, "Level deleted");

        Ok(())
    }
}

fn scoped_level_query(scope: &Scope, level_id: LevelId) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {LEVEL_COLUMNS} FROM levels l WHERE l.id = "));
    qb.push_bind(level_id).push(" AND ");
    push_scope_predicate(&mut qb, scope, EntityKind::Level);
    qb
}

/// Loads and locks a level the principal can reach; anything else is a 404.
async fn lock_level(
    tx: &mut Transaction<'_, Postgres>,
    principal: &Principal,
    level_id: LevelId,
) -> Result<Level, AppError> {
    let scope = reachable(principal, EntityKind::Level);
    let mut qb = scoped_level_query(&scope, level_id);
    qb.push(" FOR UPDATE");
    qb.build_query_as::<Level>()
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Level not found")))
}
