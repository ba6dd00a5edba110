//! JSON API for the frontend; every route requires a session

use axum::{Json, Router, middleware, routing::get};

use crate::{
    AppState,
    middleware::{CurrentUser, require_auth},
    models::UserInfo,
};

/// Routes mounted under `/api`
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/user", get(current_user))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

/// Profile of the signed-in user
pub async fn current_user(CurrentUser(user): CurrentUser) -> Json<UserInfo> {
    Json(user.to_info())
}
