//! Schools, the root of the tenancy tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siges_core::serde::double_option;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{SchoolId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub address: String,
    pub contact_info: Option<String>,
    /// Account with role `director` that runs this school.
    #[sqlx(rename = "director_id")]
    pub director: Option<UserId>,
    pub logo_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/schools/` and `PUT /api/schools/{id}/`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Lycée Moderne de Cocody")]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(max = 100))]
    pub contact_info: Option<String>,
    pub director: Option<UserId>,
    #[validate(url(message = "Enter a valid URL."), length(max = 200))]
    pub logo_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Body of `PATCH /api/schools/{id}/`. Absent fields are left unchanged;
/// `null` clears a nullable field.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSchoolDto {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub contact_info: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub director: Option<Option<UserId>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub logo_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl UpdateSchoolDto {
    /// `validator` skips `Option<Option<_>>`, so the nullable fields are
    /// checked here.
    pub fn nullable_field_errors(&self) -> Vec<(&'static str, &'static str)> {
        let mut errors = Vec::new();
        if let Some(Some(contact)) = &self.contact_info
            && contact.chars().count() > 100
        {
            errors.push((
                "contact_info",
                "Ensure this field has no more than 100 characters.",
            ));
        }
        if let Some(Some(url)) = &self.logo_url
            && (url.len() > 200 || !validator::ValidateUrl::validate_url(url))
        {
            errors.push(("logo_url", "Enter a valid URL."));
        }
        errors
    }
}

/// A full replacement only touches `director` when the body names one, which
/// mirrors how the remaining optional fields behave.
impl From<CreateSchoolDto> for UpdateSchoolDto {
    fn from(dto: CreateSchoolDto) -> Self {
        Self {
            name: Some(dto.name),
            address: Some(dto.address),
            contact_info: dto.contact_info.map(Some),
            director: dto.director.map(Some),
            logo_url: dto.logo_url.map(Some),
            is_active: dto.is_active,
        }
    }
}
