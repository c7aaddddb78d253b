//! Students and their parent links.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use siges_core::serde::double_option;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidateUrl};

use crate::ids::{ClassId, LevelId, SchoolId, StudentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "gender", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "student_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
    TransferredOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub photo_url: Option<String>,
    #[sqlx(rename = "school_class_id")]
    pub school_class: ClassId,
    /// Linked accounts with role `parent`, ordered by id.
    pub parents: Vec<UserId>,
    /// Stamped on insert and never changed afterwards.
    pub enrollment_date: NaiveDate,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/students/` and `PUT /api/students/{id}/`.
///
/// There is no `enrollment_date` field: the server stamps it and an incoming
/// value is ignored.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[schema(example = "2012-09-01")]
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub address: Option<String>,
    #[validate(length(max = 150))]
    pub emergency_contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub emergency_contact_phone: Option<String>,
    #[validate(url(message = "Enter a valid URL."), length(max = 255))]
    pub photo_url: Option<String>,
    pub school_class: ClassId,
    /// Parent accounts to link. Left out on a replacement, the current links
    /// are kept.
    pub parents: Option<Vec<UserId>>,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub emergency_contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub emergency_contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub photo_url: Option<Option<String>>,
    pub school_class: Option<ClassId>,
    /// Replaces the whole parent set when present.
    pub parents: Option<Vec<UserId>>,
    pub status: Option<StudentStatus>,
}

impl UpdateStudentDto {
    /// Checks on the nullable fields, which `validator` does not descend into.
    pub fn nullable_field_errors(&self) -> Vec<(&'static str, &'static str)> {
        let mut errors = Vec::new();
        if let Some(Some(name)) = &self.emergency_contact_name
            && name.chars().count() > 150
        {
            errors.push((
                "emergency_contact_name",
                "Ensure this field has no more than 150 characters.",
            ));
        }
        if let Some(Some(phone)) = &self.emergency_contact_phone
            && phone.chars().count() > 20
        {
            errors.push((
                "emergency_contact_phone",
                "Ensure this field has no more than 20 characters.",
            ));
        }
        if let Some(Some(url)) = &self.photo_url
            && (url.len() > 255 || !url.validate_url())
        {
            errors.push(("photo_url", "Enter a valid URL."));
        }
        errors
    }
}

impl From<CreateStudentDto> for UpdateStudentDto {
    fn from(dto: CreateStudentDto) -> Self {
        Self {
            first_name: Some(dto.first_name),
            last_name: Some(dto.last_name),
            date_of_birth: Some(dto.date_of_birth),
            gender: Some(dto.gender),
            address: dto.address.map(Some),
            emergency_contact_name: dto.emergency_contact_name.map(Some),
            emergency_contact_phone: dto.emergency_contact_phone.map(Some),
            photo_url: dto.photo_url.map(Some),
            school_class: Some(dto.school_class),
            parents: dto.parents,
            status: dto.status,
        }
    }
}

/// Narrowing filters for `GET /api/students/`. Only honoured for
/// super-admins; when several are given the most specific one wins
/// (class, then level, then school).
///
/// Values stay raw until [`StudentFilterParams::resolve`] so that callers
/// whose listing ignores them never fail on a malformed one.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentFilterParams {
    /// School UUID.
    pub school_id: Option<String>,
    /// Level UUID.
    pub level_id: Option<String>,
    /// Class UUID.
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentFilter {
    Class(ClassId),
    Level(LevelId),
    School(SchoolId),
}

impl StudentFilterParams {
    /// The most specific filter supplied. Empty values count as absent;
    /// anything else that is not a UUID is returned as an offending field.
    pub fn resolve(&self) -> Result<Option<StudentFilter>, Vec<&'static str>> {
        let mut malformed = Vec::new();
        let mut parse = |field: &'static str, raw: &Option<String>| -> Option<Uuid> {
            match raw.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(value) => Uuid::parse_str(value)
                    .map_err(|_| malformed.push(field))
                    .ok(),
            }
        };

        let class = parse("class_id", &self.class_id);
        let level = parse("level_id", &self.level_id);
        let school = parse("school_id", &self.school_id);

        if !malformed.is_empty() {
            return Err(malformed);
        }

        Ok(class
            .map(|id| StudentFilter::Class(id.into()))
            .or_else(|| level.map(|id| StudentFilter::Level(id.into())))
            .or_else(|| school.map(|id| StudentFilter::School(id.into()))))
    }
}
