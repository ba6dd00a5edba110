//! Middleware for session authentication

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    async_trait,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{AppState, error::AppError, models::User, session::Session};

/// User loaded by [`require_auth`]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Reject requests without an authenticated session
///
/// The session's user is loaded from the user store and added to the
/// request extensions as a [`CurrentUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = session.user_id().ok_or(AppError::Unauthorized)?;

    // The account may have been removed after the session was created
    let Some(user) = state.users.find_by_id(user_id).await? else {
        warn!("Session refers to unknown user: {}", user_id);
        return Err(AppError::Unauthorized);
    };

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
