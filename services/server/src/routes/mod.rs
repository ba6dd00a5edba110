//! HTTP routes

use axum::{
    Json, Router,
    http::{
        HeaderName, Method,
        header::{ACCEPT, CONTENT_TYPE, ORIGIN},
    },
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod api;
pub mod auth;
pub mod notes;
pub mod oauth;

/// Create the router for the sticky-notes server
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.cors_origin.clone())
        .allow_credentials(true)
        .allow_headers([
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            CONTENT_TYPE,
            ACCEPT,
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    Router::new()
        .route("/health", get(health_check))
        .route("/authenticated", get(auth::authenticated))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/signup", post(auth::signup))
        .route("/auth/:provider", get(oauth::start))
        .route("/auth/:provider/callback", get(oauth::callback))
        .route("/notes/new", get(notes::new_note))
        .nest("/api", api::router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "sticky-notes"
    }))
}
