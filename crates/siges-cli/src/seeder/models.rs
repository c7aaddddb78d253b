//! Seed rows and the knobs that size a seeding run.

use chrono::NaiveDate;
use siges_models::{ClassId, Cycle, Gender, LevelId, Role, SchoolId};

pub struct SchoolSeed {
    pub name: String,
    pub address: String,
    pub contact_info: String,
}

pub struct LevelSeed {
    pub name: String,
    pub cycle: Cycle,
    pub school_id: SchoolId,
}

pub struct ClassSeed {
    pub name: String,
    pub academic_year: String,
    pub level_id: LevelId,
}

pub struct UserSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub school_id: Option<SchoolId>,
}

pub struct StudentSeed {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub school_class_id: ClassId,
}

/// Staff accounts attached to each school, on top of its director.
#[derive(Clone)]
pub struct StaffPerSchool {
    pub admins: usize,
    pub teachers: usize,
    pub accountants: usize,
}

impl Default for StaffPerSchool {
    fn default() -> Self {
        Self {
            admins: 1,
            teachers: 4,
            accountants: 1,
        }
    }
}

#[derive(Clone)]
pub struct LevelsPerSchool {
    pub count: usize,
    pub classes_per_level: usize,
    pub students_per_class: usize,
    /// Siblings sharing one parent account.
    pub students_per_parent: usize,
}

impl Default for LevelsPerSchool {
    fn default() -> Self {
        Self {
            count: 6,
            classes_per_level: 2, // e.g. A, B
            students_per_class: 20,
            students_per_parent: 2,
        }
    }
}

#[derive(Clone, Default)]
pub struct SeedConfig {
    pub num_schools: usize,
    pub staff_per_school: StaffPerSchool,
    pub levels_per_school: LevelsPerSchool,
}

impl SeedConfig {
    pub fn new(num_schools: usize) -> Self {
        Self {
            num_schools,
            ..Default::default()
        }
    }

    pub fn with_staff(mut self, staff: StaffPerSchool) -> Self {
        self.staff_per_school = staff;
        self
    }

    pub fn with_levels(mut self, levels: LevelsPerSchool) -> Self {
        self.levels_per_school = levels;
        self
    }

    pub fn students_per_school(&self) -> usize {
        self.levels_per_school.count
            * self.levels_per_school.classes_per_level
            * self.levels_per_school.students_per_class
    }

    /// Director plus staff plus one parent per group of siblings in a class.
    pub fn accounts_per_school(&self) -> usize {
        let staff = &self.staff_per_school;
        let levels = &self.levels_per_school;
        let parents = levels.count
            * levels.classes_per_level
            * parents_for(levels.students_per_class, levels.students_per_parent);
        1 + staff.admins + staff.teachers + staff.accountants + parents
    }
}

pub(crate) fn parents_for(students: usize, students_per_parent: usize) -> usize {
    students.div_ceil(students_per_parent.max(1))
}
