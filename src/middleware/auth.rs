use std::collections::BTreeSet;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};

use siges_auth::{Claims, Deny, Principal, verify_token};
use siges_core::AppError;
use siges_models::{Email, Role, SchoolId, UserId};

use crate::state::AppState;

/// Extractor that validates the bearer token and yields its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Deny::Unauthenticated.into_app_error())?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Authorization header must contain a Bearer token")
        })?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Extractor yielding the authenticated [`Principal`].
///
/// The token only identifies the account; role and directed schools are
/// loaded from the database so that changes take effect immediately.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        let user_id = auth_user.user_id()?;

        let principal = load_principal(&state.db, user_id).await?.ok_or_else(|| {
            warn!(user.id = %user_id, "Token subject no longer exists");
            AppError::unauthorized("User not found")
        })?;

        debug!(
            user.id = %principal.id,
            user.role = %principal.role,
            directed_schools = principal.directed_schools.len(),
            "Resolved principal"
        );

        Ok(CurrentPrincipal(principal))
    }
}

#[derive(FromRow)]
struct PrincipalRow {
    id: UserId,
    email: Email,
    role: Role,
    school_id: Option<SchoolId>,
}

pub async fn load_principal(db: &PgPool, user_id: UserId) -> Result<Option<Principal>, AppError> {
    let Some(row) = sqlx::query_as::<_, PrincipalRow>(
        "SELECT id, email, role, school_id FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    else {
        return Ok(None);
    };

    let directed_schools: Vec<SchoolId> =
        sqlx::query_scalar("SELECT id FROM schools WHERE director_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(db)
            .await?;

    Ok(Some(Principal {
        id: row.id,
        email: row.email,
        role: row.role,
        school_id: row.school_id,
        directed_schools: directed_schools.into_iter().collect::<BTreeSet<_>>(),
    }))
}
