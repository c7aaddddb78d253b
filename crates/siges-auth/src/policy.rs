//! The access policy.
//!
//! One table, [`grant`], says what each role may do to each entity kind.
//! [`authorize`] combines that grant with the principal's [`Scope`](crate::scope::Scope) to
//! decide a concrete request. Every handler goes through `authorize`; no
//! handler carries its own role checks.
//!
//! Requests are decided in three steps:
//!
//! 1. collection gate: `authorize(.., Target::Collection)` before touching
//!    storage, which rejects roles with no grant at all;
//! 2. scoped fetch: the row is loaded through the scope predicate, so rows
//!    outside the scope are indistinguishable from missing ones;
//! 3. row check: `authorize(.., Target::Row(..))` on the loaded row, or on
//!    the prospective parent for creations.

use siges_core::AppError;
use siges_models::{Role, SchoolId};
use thiserror::Error;

use crate::principal::Principal;
use crate::scope::{RowAncestry, reachable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    School,
    Level,
    SchoolClass,
    Student,
    User,
}

/// What a role is granted on an entity kind for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Deny,
    /// Any authenticated principal, on any row.
    Authenticated,
    /// Unrestricted.
    Any,
    /// Only rows inside the principal's scope.
    InScope,
}

#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// The action addresses the collection; rows are filtered afterwards.
    Collection,
    /// The action addresses one row, or a new row under this ancestry.
    Row(&'a RowAncestry),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Deny {
    #[error("Authentication credentials were not provided.")]
    Unauthenticated,
    #[error("You do not have permission to perform this action.")]
    Forbidden,
    #[error("The target school is ambiguous; specify it explicitly.")]
    AmbiguousTarget,
}

impl Deny {
    pub fn reason(&self) -> &'static str {
        match self {
            Deny::Unauthenticated => "unauthenticated",
            Deny::Forbidden => "forbidden",
            Deny::AmbiguousTarget => "ambiguous-target",
        }
    }

    /// 401, 403, or a 400 on the `school` field.
    pub fn into_app_error(self) -> AppError {
        match self {
            Deny::Unauthenticated => AppError::unauthorized(self.to_string()),
            Deny::Forbidden => AppError::forbidden(self.to_string()),
            Deny::AmbiguousTarget => AppError::field("school", self.to_string()),
        }
    }
}

pub fn grant(role: Role, entity: EntityKind, action: Action) -> Grant {
    use Action::*;
    use EntityKind::*;

    match (role, entity, action) {
        (Role::SuperAdmin, _, _) => Grant::Any,

        (_, School, List | Retrieve) => Grant::Authenticated,
        (Role::Director, School, Update | PartialUpdate | Destroy) => Grant::InScope,

        (Role::Director, Level | SchoolClass | Student, _) => Grant::InScope,
        (Role::Director, User, List | Retrieve) => Grant::InScope,

        // Reads by everyone else are filtered by their (possibly empty) scope.
        (_, Level | SchoolClass | Student | User, List | Retrieve) => Grant::InScope,

        _ => Grant::Deny,
    }
}

pub fn authorize(
    principal: Option<&Principal>,
    action: Action,
    entity: EntityKind,
    target: Target<'_>,
) -> Result<(), Deny> {
    let Some(principal) = principal else {
        return Err(Deny::Unauthenticated);
    };

    match grant(principal.role, entity, action) {
        Grant::Deny => Err(Deny::Forbidden),
        Grant::Any | Grant::Authenticated => Ok(()),
        Grant::InScope => match target {
            Target::Collection => Ok(()),
            Target::Row(row) if reachable(principal, entity).contains(row) => Ok(()),
            Target::Row(_) => Err(Deny::Forbidden),
        },
    }
}

/// Picks the school a new level belongs to.
///
/// A super-admin must name it. A director may name one of their schools, or
/// omit it when they direct exactly one.
pub fn resolve_level_school(
    principal: &Principal,
    requested: Option<SchoolId>,
) -> Result<SchoolId, Deny> {
    authorize(
        Some(principal),
        Action::Create,
        EntityKind::Level,
        Target::Collection,
    )?;

    let school = match (requested, principal.role) {
        (Some(school), _) => school,
        (None, Role::Director) => principal
            .sole_directed_school()
            .ok_or(Deny::AmbiguousTarget)?,
        (None, _) => return Err(Deny::AmbiguousTarget),
    };

    authorize(
        Some(principal),
        Action::Create,
        EntityKind::Level,
        Target::Row(&RowAncestry::within(Some(school))),
    )?;

    Ok(school)
}
