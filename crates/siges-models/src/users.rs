//! Accounts and roles.
//!
//! Every account carries exactly one [`Role`]. The role alone decides which
//! actions are granted; which rows are reachable additionally depends on the
//! schools a director directs or the students a parent is linked to.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siges_core::serde::double_option;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{SchoolId, UserId};
use crate::value_types::Email;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Director,
    Teacher,
    #[default]
    Parent,
    Accountant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Director => "director",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::Accountant => "accountant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account as exposed by the API. The password hash never leaves the
/// database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    /// School the account is attached to, if any.
    #[sqlx(rename = "school_id")]
    pub school: Option<SchoolId>,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Self-service registration.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterUserDto {
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "parent@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
    /// Must equal `password`.
    pub password2: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    /// Defaults to `parent`. `super_admin` cannot be self-assigned.
    pub role: Option<Role>,
}

/// Account created by a super-admin, with any role and an optional school.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(email(message = "Enter a valid email address."))]
    #[schema(example = "teacher@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    pub role: Role,
    pub school: Option<SchoolId>,
}

/// Full replacement of an account's editable fields. An omitted `school`
/// detaches the account.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplaceUserDto {
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub school: Option<SchoolId>,
}

impl From<ReplaceUserDto> for UpdateUserDto {
    fn from(dto: ReplaceUserDto) -> Self {
        Self {
            first_name: Some(dto.first_name),
            last_name: Some(dto.last_name),
            role: Some(dto.role),
            school: Some(dto.school),
        }
    }
}

/// Partial update of an account, reserved to super-admins.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub role: Option<Role>,
    /// `null` detaches the account from its school.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub school: Option<Option<SchoolId>>,
}
