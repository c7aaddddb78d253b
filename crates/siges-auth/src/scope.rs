//! Row reachability.
//!
//! A [`Scope`] is the set of rows of one entity kind a principal may see.
//! It is evaluated in two places that must agree: [`Scope::contains`] for a
//! single row already in memory, and the SQL predicate the HTTP layer
//! renders from the same value for list queries.

use std::collections::BTreeSet;

use siges_models::{Role, SchoolId, UserId};

use crate::policy::EntityKind;
use crate::principal::Principal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every row.
    All,
    /// Rows whose ancestor school is directed by `director`.
    DirectedSchools {
        director: UserId,
        schools: BTreeSet<SchoolId>,
    },
    /// Students linked to this parent account.
    ChildrenOf(UserId),
    /// No row at all.
    Nothing,
}

/// What the policy needs to know about a row: its ancestor school, the
/// director of that school when the row is a school, and the linked parents
/// when the row is a student.
///
/// A broken ownership chain is represented by `school: None` and never
/// matches a director scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowAncestry {
    pub school: Option<SchoolId>,
    pub director: Option<UserId>,
    pub parents: Vec<UserId>,
}

impl RowAncestry {
    pub fn school(id: SchoolId, director: Option<UserId>) -> Self {
        Self {
            school: Some(id),
            director,
            parents: Vec::new(),
        }
    }

    /// A level, class, or user row hanging under `school`.
    pub fn within(school: Option<SchoolId>) -> Self {
        Self {
            school,
            ..Self::default()
        }
    }

    pub fn student(school: Option<SchoolId>, parents: Vec<UserId>) -> Self {
        Self {
            school,
            director: None,
            parents,
        }
    }
}

impl Scope {
    pub fn contains(&self, row: &RowAncestry) -> bool {
        match self {
            Scope::All => true,
            Scope::Nothing => false,
            Scope::DirectedSchools { director, schools } => {
                row.director == Some(*director)
                    || row.school.is_some_and(|school| schools.contains(&school))
            }
            Scope::ChildrenOf(parent) => row.parents.contains(parent),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Scope::All)
    }
}

/// The rows of `entity` that `principal` can reach.
///
/// Roles without a tenancy rule (admin, teacher, accountant) reach nothing.
pub fn reachable(principal: &Principal, entity: EntityKind) -> Scope {
    match (principal.role, entity) {
        (Role::SuperAdmin, _) => Scope::All,
        (Role::Director, _) => Scope::DirectedSchools {
            director: principal.id,
            schools: principal.directed_schools.clone(),
        },
        (Role::Parent, EntityKind::Student) => Scope::ChildrenOf(principal.id),
        _ => Scope::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::fixtures::principal;

    #[test]
    fn director_reaches_rows_under_directed_schools_only() {
        let own = SchoolId::new();
        let other = SchoolId::new();
        let director = principal(Role::Director, &[own]);
        let scope = reachable(&director, EntityKind::SchoolClass);

        assert!(scope.contains(&RowAncestry::within(Some(own))));
        assert!(!scope.contains(&RowAncestry::within(Some(other))));
        assert!(!scope.contains(&RowAncestry::within(None)));
    }

    #[test]
    fn director_reaches_school_through_back_reference() {
        let director = principal(Role::Director, &[]);
        let scope = reachable(&director, EntityKind::School);
        let school = SchoolId::new();

        assert!(scope.contains(&RowAncestry::school(school, Some(director.id))));
        assert!(!scope.contains(&RowAncestry::school(school, None)));
    }

    #[test]
    fn parent_reaches_linked_students_only() {
        let parent = principal(Role::Parent, &[]);
        let scope = reachable(&parent, EntityKind::Student);
        let school = Some(SchoolId::new());

        assert_eq!(scope, Scope::ChildrenOf(parent.id));
        assert!(scope.contains(&RowAncestry::student(school, vec![UserId::new(), parent.id])));
        assert!(!scope.contains(&RowAncestry::student(school, vec![UserId::new()])));
        assert!(!scope.contains(&RowAncestry::student(school, vec![])));
    }

    #[test]
    fn parent_reaches_no_levels() {
        let parent = principal(Role::Parent, &[]);
        assert_eq!(reachable(&parent, EntityKind::Level), Scope::Nothing);
    }

    #[test]
    fn staff_roles_without_rules_reach_nothing() {
        for role in [Role::Admin, Role::Teacher, Role::Accountant] {
            let p = principal(role, &[]);
            for entity in [
                EntityKind::Level,
                EntityKind::SchoolClass,
                EntityKind::Student,
                EntityKind::User,
            ] {
                assert_eq!(reachable(&p, entity), Scope::Nothing);
            }
        }
    }

    #[test]
    fn super_admin_reaches_everything() {
        let admin = principal(Role::SuperAdmin, &[]);
        let scope = reachable(&admin, EntityKind::Student);
        assert!(scope.is_unrestricted());
        assert!(scope.contains(&RowAncestry::within(None)));
    }
}
