//! OAuth sign-in with Google and GitHub
//!
//! `GET /auth/:provider` stores a pending handshake in the session and sends
//! the browser to the consent screen. The provider returns it to
//! `GET /auth/:provider/callback`, which checks the state, resolves the user
//! and establishes a fresh session. Every failure ends on the frontend login
//! page without a session.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::SignedCookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    AppState,
    auth::{AuthError, Authenticator, Credentials, OAuthError, resolve_user},
    error::AppResult,
    models::{PendingOAuth, Provider, User},
    session::Session,
};

#[derive(Debug, Deserialize)]
pub struct StartParams {
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Redirect to the provider's consent screen
pub async fn start(
    State(state): State<AppState>,
    Path(provider): Path<Provider>,
    Query(params): Query<StartParams>,
    mut session: Session,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    let client = match state.oauth_client(provider) {
        Ok(client) => client,
        Err(e) => {
            warn!("Cannot start {} sign-in: {}", provider, e);
            return Ok(Redirect::to(&state.config.login_url()).into_response());
        }
    };

    let (auth_url, csrf_token, pkce_verifier) = client.generate_auth_url();
    session.data.oauth = Some(PendingOAuth {
        provider,
        csrf_state: csrf_token.secret().clone(),
        pkce_verifier: pkce_verifier.secret().clone(),
    });

    if let Some(target) = params.return_to {
        match state.config.return_target(&target) {
            Some(target) => session.data.return_to = Some(target),
            None => warn!("Ignoring return_to outside the allowed origins: {:?}", target),
        }
    }

    let jar = state.sessions.save(jar, &mut session).await?;
    Ok((jar, Redirect::to(&auth_url)).into_response())
}

/// Complete the handshake started by [`start`]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<Provider>,
    Query(params): Query<CallbackParams>,
    mut session: Session,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    match verify(&state, provider, &mut session, params).await {
        Ok(user) => {
            info!("{} sign-in succeeded for user: {}", provider, user.id);
            session.data.user_id = Some(user.id);
            let target = session
                .data
                .return_to
                .take()
                .and_then(|target| state.config.return_target(&target))
                .unwrap_or_else(|| state.config.frontend_url.clone());
            let jar = state.sessions.regenerate(jar, &mut session).await?;

            Ok((jar, Redirect::to(&target)).into_response())
        }
        Err(e) => {
            warn!("{} sign-in failed: {}", provider, e);
            // Persist the consumed handshake, but never create a session here
            let jar = if session.id().is_some() {
                state.sessions.save(jar, &mut session).await?
            } else {
                jar
            };

            Ok((jar, Redirect::to(&state.config.login_url())).into_response())
        }
    }
}

async fn verify(
    state: &AppState,
    provider: Provider,
    session: &mut Session,
    params: CallbackParams,
) -> Result<User, AuthError> {
    // The handshake is single use, whatever the outcome
    let pending = session.data.oauth.take();

    if let Some(error) = params.error {
        return Err(OAuthError::Denied(error).into());
    }

    let client = state.oauth_client(provider)?;
    let pending = pending
        .filter(|p| p.provider == provider)
        .ok_or(OAuthError::NoPendingHandshake)?;

    if params.state.as_deref() != Some(pending.csrf_state.as_str()) {
        return Err(OAuthError::StateMismatch.into());
    }

    let code = params.code.ok_or(OAuthError::MissingCode)?;
    let identity = client
        .authenticate(Credentials::AuthorizationCode {
            code,
            pkce_verifier: pending.pkce_verifier,
        })
        .await?;

    resolve_user(state.users.as_ref(), &identity).await
}
