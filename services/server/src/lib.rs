//! Sticky notes server
//!
//! Session-based authentication (email and password, Google and GitHub
//! OAuth), a small JSON API for the frontend and the note editor page.
//! [`AppState::init`] connects the configured stores and
//! [`routes::create_router`] builds the axum application around it.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod rate_limiter;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;
pub mod views;

pub use state::AppState;
