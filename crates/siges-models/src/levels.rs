//! Levels: grade bands owned by exactly one school.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{LevelId, SchoolId};

/// Educational cycle a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "level_cycle", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Cycle {
    Preschool,
    Primary,
    LowerSecondary,
    UpperSecondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    pub cycle: Cycle,
    #[sqlx(rename = "school_id")]
    pub school: SchoolId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLevelDto {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "6ème")]
    pub name: String,
    pub cycle: Cycle,
    /// Owning school. Directors of a single school may omit it; the nested
    /// `/api/schools/{id}/levels/` route takes it from the path.
    pub school: Option<SchoolId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLevelDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub cycle: Option<Cycle>,
}

impl From<CreateLevelDto> for UpdateLevelDto {
    fn from(dto: CreateLevelDto) -> Self {
        Self {
            name: Some(dto.name),
            cycle: Some(dto.cycle),
        }
    }
}
