use axum::{Router, routing::get};

use crate::modules::classes::controller::{create_level_class, list_level_classes};
use crate::state::AppState;

use super::controller::{create_level, delete_level, get_level, list_levels, replace_level, update_level};

pub fn init_levels_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_levels).post(create_level))
        .route(
            "/{id}",
            get(get_level)
                .put(replace_level)
                .patch(update_level)
                .delete(delete_level),
        )
        .route("/{id}/classes", get(list_level_classes).post(create_level_class))
}
