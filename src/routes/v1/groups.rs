use crate::handlers::v1::groups;
use crate::{app_state::AppState, middlewares::auth::auth_middleware};
use axum::routing::{delete, get, post};
use axum::{middleware, Router};

pub fn groups_routes() -> Router<AppState> {
    // Protected routes that require authentication
    Router::new()
        .route("/", post(groups::create_group))
        .route("/{group_id}", get(groups::get_group))
        .route("/{group_id}/leave", post(groups::leave_group))
        .route("/{group_id}/members", post(groups::add_member))
        .route("/{group_id}/members/{user_id}", delete(groups::remove_member))
        .route("/{group_id}/admins", post(groups::promote_to_admin))
        .route("/{group_id}/admins/{user_id}", delete(groups::demote_from_admin))
        .route("/{group_id}/messages", post(groups::post_message))
        .layer(middleware::from_fn(auth_middleware))
}
