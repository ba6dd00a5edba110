//! Note pages

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::SignedCookieJar;

use crate::{AppState, error::AppResult, session::Session, views::NoteEditor};

/// Blank note editor; anonymous visitors are sent to log in first
pub async fn new_note(
    State(state): State<AppState>,
    mut session: Session,
    jar: SignedCookieJar,
) -> AppResult<Response> {
    if session.is_authenticated() {
        return Ok(Html(NoteEditor::default().render()).into_response());
    }

    session.data.return_to = Some(format!("{}/notes/new", state.config.base_url));
    let jar = state.sessions.save(jar, &mut session).await?;

    Ok((jar, Redirect::to(&state.config.login_url())).into_response())
}
