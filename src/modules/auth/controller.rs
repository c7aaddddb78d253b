use axum::{Json, extract::State};
use tracing::instrument;

use siges_core::AppError;

use crate::modules::auth::model::{AccessToken, TokenObtainRequest, TokenPair, TokenRefreshRequest};
use crate::modules::auth::service::AuthService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/token/",
    request_body = TokenObtainRequest,
    responses(
        (status = 200, description = "Access and refresh tokens", body = TokenPair),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "No active account found with the given credentials")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn obtain_token_pair(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<TokenObtainRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = AuthService::obtain_token_pair(&state.db, dto, &state.jwt_config).await?;
    Ok(Json(pair))
}

#[utoipa::path(
    post,
    path = "/api/token/refresh/",
    request_body = TokenRefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn refresh_access_token(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<TokenRefreshRequest>,
) -> Result<Json<AccessToken>, AppError> {
    let token = AuthService::refresh_access_token(&state.db, dto, &state.jwt_config).await?;
    Ok(Json(token))
}
