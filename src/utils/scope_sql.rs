//! Renders a [`Scope`] as a SQL predicate.
//!
//! Queries must use these table aliases: `sc` for schools, `l` for levels
//! (joined for classes and students), `s` for students and `u` for users.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use siges_auth::{EntityKind, Scope};

/// Appends a boolean expression restricting `entity` rows to `scope`.
pub fn push_scope_predicate(qb: &mut QueryBuilder<'_, Postgres>, scope: &Scope, entity: EntityKind) {
    match scope {
        Scope::All => {
            qb.push("TRUE");
        }
        Scope::Nothing => {
            qb.push("FALSE");
        }
        Scope::DirectedSchools { director, schools } => {
            let schools: Vec<Uuid> = schools.iter().map(|id| id.into_inner()).collect();
            match entity {
                EntityKind::School => {
                    qb.push("(sc.director_id = ")
                        .push_bind(director.into_inner())
                        .push(" OR sc.id = ANY(")
                        .push_bind(schools)
                        .push("))");
                }
                EntityKind::User => {
                    qb.push("u.school_id = ANY(").push_bind(schools).push(")");
                }
                EntityKind::Level | EntityKind::SchoolClass | EntityKind::Student => {
                    qb.push("l.school_id = ANY(").push_bind(schools).push(")");
                }
            }
        }
        Scope::ChildrenOf(parent) => match entity {
            EntityKind::Student => {
                qb.push(
                    "EXISTS (SELECT 1 FROM student_parents sp WHERE sp.student_id = s.id AND sp.parent_id = ",
                )
                .push_bind(parent.into_inner())
                .push(")");
            }
            _ => {
                qb.push("FALSE");
            }
        },
    }
}
