use axum::{Router, routing::get};

use crate::modules::levels::controller::{create_school_level, list_school_levels};
use crate::state::AppState;

use super::controller::{
    create_school, delete_school, get_school, list_schools, replace_school, update_school,
};

pub fn init_schools_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_schools).post(create_school))
        .route(
            "/{id}",
            get(get_school)
                .put(replace_school)
                .patch(update_school)
                .delete(delete_school),
        )
        .route(
            "/{id}/levels",
            get(list_school_levels).post(create_school_level),
        )
}
