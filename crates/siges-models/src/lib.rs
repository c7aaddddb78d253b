//! # SIGES Models
//!
//! Database entities, request DTOs and typed identifiers for the SIGES API.
//!
//! # Modules
//!
//! - [`ids`]: strongly-typed UUID wrappers per entity
//! - [`value_types`]: validated primitives (email)
//! - [`users`]: accounts and the [`Role`] enum
//! - [`schools`], [`levels`], [`classes`], [`students`]: the tenancy tree
//! - [`auth`]: token request and response bodies
//!
//! ```ignore
//! use siges_models::{Role, SchoolId, students::CreateStudentDto};
//! ```

pub mod auth;
pub mod classes;
pub mod ids;
pub mod levels;
pub mod schools;
pub mod students;
pub mod users;
pub mod value_types;

pub use auth::{AccessToken, TokenObtainRequest, TokenPair, TokenRefreshRequest};
pub use classes::{CreateClassDto, SchoolClass, UpdateClassDto};
pub use ids::{ClassId, LevelId, SchoolId, StudentId, UserId};
pub use levels::{CreateLevelDto, Cycle, Level, UpdateLevelDto};
pub use schools::{CreateSchoolDto, School, UpdateSchoolDto};
pub use students::{
    CreateStudentDto, Gender, Student, StudentFilter, StudentFilterParams, StudentStatus,
    UpdateStudentDto,
};
pub use users::{CreateUserDto, RegisterUserDto, ReplaceUserDto, Role, UpdateUserDto, User};
pub use value_types::{Email, ValueTypeError};
