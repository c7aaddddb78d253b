use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{obtain_token_pair, refresh_access_token};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/", post(obtain_token_pair))
        .route("/refresh", post(refresh_access_token))
}
