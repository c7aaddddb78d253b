//! Glue between handlers and the access policy.

use std::collections::BTreeSet;

use sqlx::{Executor, Postgres, Transaction};
use tracing::debug;

use siges_auth::{Action, EntityKind, Principal, RowAncestry, Target, authorize};
use siges_core::AppError;
use siges_models::{ClassId, LevelId, Role, SchoolId};

/// `authorize` for an already-authenticated principal, as an `AppError`.
pub fn ensure(
    principal: &Principal,
    action: Action,
    entity: EntityKind,
    target: Target<'_>,
) -> Result<(), AppError> {
    authorize(Some(principal), action, entity, target).map_err(|deny| {
        debug!(
            user.id = %principal.id,
            user.role = %principal.role,
            ?action,
            ?entity,
            reason = deny.reason(),
            "Access denied"
        );
        deny.into_app_error()
    })
}

/// Row check against the ancestor school of a level, class, user or student.
pub fn ensure_within(
    principal: &Principal,
    action: Action,
    entity: EntityKind,
    school: Option<SchoolId>,
) -> Result<(), AppError> {
    ensure(
        principal,
        action,
        entity,
        Target::Row(&RowAncestry::within(school)),
    )
}

/// The principal as of `tx`. A director's schools are re-read and held with
/// `FOR SHARE` until the transaction ends; other roles are returned as loaded.
pub async fn lock_directed_schools(
    tx: &mut Transaction<'_, Postgres>,
    principal: &Principal,
) -> Result<Principal, AppError> {
    if principal.role != Role::Director {
        return Ok(principal.clone());
    }

    let schools: Vec<SchoolId> =
        sqlx::query_scalar("SELECT id FROM schools WHERE director_id = $1 ORDER BY id FOR SHARE")
            .bind(principal.id)
            .fetch_all(&mut **tx)
            .await?;

    let directed_schools: BTreeSet<SchoolId> = schools.into_iter().collect();
    if directed_schools != principal.directed_schools {
        debug!(user.id = %principal.id, "Directed schools changed during the request");
    }

    Ok(Principal {
        directed_schools,
        ..principal.clone()
    })
}

pub async fn school_of_level<'c, E>(executor: E, level: LevelId) -> Result<Option<SchoolId>, AppError>
where
    E: Executor<'c, Database = Postgres>,
{
    let school = sqlx::query_scalar("SELECT school_id FROM levels WHERE id = $1")
        .bind(level)
        .fetch_optional(executor)
        .await?;
    Ok(school)
}

pub async fn school_of_class<'c, E>(executor: E, class: ClassId) -> Result<Option<SchoolId>, AppError>
where
    E: Executor<'c, Database = Postgres>,
{
    let school = sqlx::query_scalar(
        r#"SELECT l.school_id
           FROM classes c
           JOIN levels l ON l.id = c.level_id
           WHERE c.id = $1"#,
    )
    .bind(class)
    .fetch_optional(executor)
    .await?;
    Ok(school)
}
