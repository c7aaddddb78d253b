//! School classes: a cohort inside a level for one academic year.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{ClassId, LevelId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct SchoolClass {
    pub id: ClassId,
    pub name: String,
    #[schema(example = "2024-2025")]
    pub academic_year: String,
    #[sqlx(rename = "level_id")]
    pub level: LevelId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClassDto {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "6ème A")]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub academic_year: String,
    /// Required on `/api/classes/`; the nested route takes it from the path.
    pub level: Option<LevelId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClassDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub academic_year: Option<String>,
}

impl From<CreateClassDto> for UpdateClassDto {
    fn from(dto: CreateClassDto) -> Self {
        Self {
            name: Some(dto.name),
            academic_year: Some(dto.academic_year),
        }
    }
}
