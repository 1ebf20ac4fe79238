pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod validate;

use axum::{
    routing::{get, post},
    Router,
};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/user/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/search", get(handlers::search_users))
        .route("/login", post(handlers::login))
}
