//! Local sign-in, signup, logout and session status

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::SignedCookieJar;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    AppState,
    auth::{Authenticator, Credentials, resolve_user},
    error::{AppError, AppResult},
    extract::JsonOrForm,
    models::LoginCredentials,
    session::Session,
    validation::{normalize_email, validate_email, validate_password},
};

/// Whether the request carries an authenticated session
pub async fn authenticated(session: Session) -> impl IntoResponse {
    Json(json!({ "auth": session.is_authenticated() }))
}

/// User login endpoint
///
/// Answers `"LOGIN SUCCESS"`, or redirects to the target saved in the
/// session when a protected page sent the browser here.
pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    jar: SignedCookieJar,
    JsonOrForm(payload): JsonOrForm<LoginCredentials>,
) -> AppResult<Response> {
    let email = normalize_email(&payload.email);
    // Malformed emails never match an account; keep them out of the limiter
    if validate_email(&email).is_err() {
        return Err(AppError::InvalidCredentials);
    }
    info!("Login attempt for user: {}", email);

    if !state.rate_limiter.check(&email).await {
        warn!("Login throttled for user: {}", email);
        return Err(AppError::TooManyAttempts);
    }

    let identity = state
        .local
        .authenticate(Credentials::Password {
            email: email.clone(),
            password: payload.password,
        })
        .await?;
    let user = resolve_user(state.users.as_ref(), &identity).await?;
    state.rate_limiter.reset(&email).await;

    session.data.user_id = Some(user.id);
    session.data.oauth = None;
    let return_to = session
        .data
        .return_to
        .take()
        .and_then(|target| state.config.return_target(&target));
    let jar = state.sessions.regenerate(jar, &mut session).await?;

    match return_to {
        Some(target) => Ok((jar, Redirect::to(&target)).into_response()),
        None => Ok((jar, Json("LOGIN SUCCESS")).into_response()),
    }
}

/// Create a local account and sign it in
pub async fn signup(
    State(state): State<AppState>,
    mut session: Session,
    jar: SignedCookieJar,
    JsonOrForm(payload): JsonOrForm<LoginCredentials>,
) -> AppResult<Response> {
    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(AppError::BadRequest)?;
    validate_password(&payload.password).map_err(AppError::BadRequest)?;

    let user = state.local.signup(&email, &payload.password).await?;

    session.data.user_id = Some(user.id);
    let jar = state.sessions.regenerate(jar, &mut session).await?;

    Ok((jar, Json(json!({ "message": "Signup successful" }))).into_response())
}

/// Destroy the session and clear its cookie
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    let jar = state.sessions.destroy(jar, &session).await?;
    Ok((jar, StatusCode::OK).into_response())
}
