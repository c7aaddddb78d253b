use sqlx::{FromRow, PgPool};
use tracing::{info, instrument, warn};

use siges_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use siges_config::jwt::JwtConfig;
use siges_core::{AppError, verify_password};
use siges_models::{Email, Role, UserId};

use crate::modules::auth::model::{AccessToken, TokenObtainRequest, TokenPair, TokenRefreshRequest};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

#[derive(FromRow)]
struct Credentials {
    id: UserId,
    email: Email,
    password: String,
    role: Role,
}

pub struct AuthService;

impl AuthService {
    /// Exchanges email and password for an access/refresh pair and stamps
    /// `last_login`.
    #[instrument(skip(db, dto, jwt_config), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn obtain_token_pair(
        db: &PgPool,
        dto: TokenObtainRequest,
        jwt_config: &JwtConfig,
    ) -> Result<TokenPair, AppError> {
        let email = dto.email.trim().to_lowercase();

        let Some(user) = sqlx::query_as::<_, Credentials>(
            "SELECT id, email, password, role FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(db)
        .await?
        else {
            warn!("Login attempt for unknown account");
            return Err(AppError::unauthorized(BAD_CREDENTIALS));
        };

        if !verify_password(&dto.password, &user.password)? {
            warn!(user.id = %user.id, "Login attempt with wrong password");
            return Err(AppError::unauthorized(BAD_CREDENTIALS));
        }

        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(db)
            .await?;

        let access = create_access_token(user.id, user.email.as_str(), user.role, jwt_config)?;
        let refresh = create_refresh_token(user.id, user.email.as_str(), jwt_config)?;

        info!(user.id = %user.id, user.role = %user.role, "User logged in");

        Ok(TokenPair { access, refresh })
    }

    /// Issues a new access token carrying the account's current role.
    #[instrument(skip(db, dto, jwt_config), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn refresh_access_token(
        db: &PgPool,
        dto: TokenRefreshRequest,
        jwt_config: &JwtConfig,
    ) -> Result<AccessToken, AppError> {
        let claims = verify_refresh_token(&dto.refresh, jwt_config)?;
        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))?;

        let (email, role): (Email, Role) =
            sqlx::query_as("SELECT email, role FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| {
                    warn!(user.id = %user_id, "Refresh for a deleted account");
                    AppError::unauthorized("User not found")
                })?;

        let access = create_access_token(user_id, email.as_str(), role, jwt_config)?;

        info!(user.id = %user_id, "Access token refreshed");

        Ok(AccessToken { access })
    }
}
