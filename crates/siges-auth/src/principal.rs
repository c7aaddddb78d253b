use std::collections::BTreeSet;

use siges_models::{Email, Role, SchoolId, UserId};

/// The authenticated account, resolved fresh from storage on every request.
///
/// `directed_schools` is derived from `schools.director_id`, never from the
/// token, so it always reflects the current state of the school table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub email: Email,
    pub role: Role,
    pub school_id: Option<SchoolId>,
    pub directed_schools: BTreeSet<SchoolId>,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// The one school a director runs, if there is exactly one.
    pub fn sole_directed_school(&self) -> Option<SchoolId> {
        if self.role != Role::Director || self.directed_schools.len() != 1 {
            return None;
        }
        self.directed_schools.iter().next().copied()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::principal;
    use super::*;

    #[test]
    fn sole_directed_school_needs_exactly_one() {
        let a = SchoolId::new();
        let b = SchoolId::new();

        assert_eq!(principal(Role::Director, &[a]).sole_directed_school(), Some(a));
        assert_eq!(principal(Role::Director, &[]).sole_directed_school(), None);
        assert_eq!(principal(Role::Director, &[a, b]).sole_directed_school(), None);
    }

    #[test]
    fn demoted_director_has_no_sole_school() {
        let a = SchoolId::new();
        assert_eq!(principal(Role::Teacher, &[a]).sole_directed_school(), None);
    }
}
