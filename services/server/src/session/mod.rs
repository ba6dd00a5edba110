//! Session gate
//!
//! A browser is identified by a random session id carried in a signed
//! cookie. The id points at a [`SessionData`] record in a [`SessionStore`].
//! Handlers take a [`Session`] extractor to learn whether the request is
//! authenticated, and use [`SessionManager`] to persist changes and to set or
//! clear the cookie.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use common::error::CacheResult;
use rand::{Rng, distributions::Alphanumeric};
use std::{sync::Arc, time::Duration};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, error::AppError, models::SessionData};

pub mod store;

pub use store::{MemorySessionStore, RedisSessionStore, SessionStore};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "sid";

/// Lifetime of a session, both in the store and in the cookie `Max-Age`
pub const SESSION_TTL_DAYS: i64 = 14;

const SESSION_ID_LEN: usize = 48;

fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Session attached to the current request
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: Option<String>,
    pub data: SessionData,
}

impl Session {
    /// Session id, if the browser already has a stored session
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Authenticated user, if any
    pub fn user_id(&self) -> Option<Uuid> {
        self.data.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.user_id.is_some()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key());
        Ok(state.sessions.load(&jar).await?)
    }
}

/// Session manager for handling browser sessions in the session store
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(store: Arc<dyn SessionStore>, secure_cookie: bool) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(SESSION_TTL_DAYS as u64 * 24 * 60 * 60),
            secure_cookie,
        }
    }

    fn cookie(&self, id: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookie)
            .max_age(time::Duration::days(SESSION_TTL_DAYS))
            .build()
    }

    /// Resolve the session named by the request cookie
    ///
    /// A missing, tampered or expired cookie yields an anonymous session.
    pub async fn load(&self, jar: &SignedCookieJar) -> CacheResult<Session> {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Session::default());
        };

        let id = cookie.value().to_string();
        match self.store.load(&id).await? {
            Some(data) => Ok(Session { id: Some(id), data }),
            None => Ok(Session::default()),
        }
    }

    /// Persist the session, allocating an id on first save
    pub async fn save(
        &self,
        jar: SignedCookieJar,
        session: &mut Session,
    ) -> CacheResult<SignedCookieJar> {
        let id = match &session.id {
            Some(id) => id.clone(),
            None => {
                let id = generate_session_id();
                session.id = Some(id.clone());
                id
            }
        };

        self.store.save(&id, &session.data, self.ttl).await?;
        Ok(jar.add(self.cookie(id)))
    }

    /// Persist the session under a fresh id, discarding the previous one
    ///
    /// Called whenever the authenticated user changes.
    pub async fn regenerate(
        &self,
        jar: SignedCookieJar,
        session: &mut Session,
    ) -> CacheResult<SignedCookieJar> {
        if let Some(old_id) = session.id.take() {
            self.store.destroy(&old_id).await?;
        }

        let jar = self.save(jar, session).await?;
        if let Some(user_id) = session.user_id() {
            info!("Session established for user: {}", user_id);
        }
        Ok(jar)
    }

    /// Delete the session from the store and clear the cookie
    pub async fn destroy(
        &self,
        jar: SignedCookieJar,
        session: &Session,
    ) -> CacheResult<SignedCookieJar> {
        if let Some(id) = session.id() {
            self.store.destroy(id).await?;
            if let Some(user_id) = session.user_id() {
                info!("Session destroyed for user: {}", user_id);
            }
        }

        Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
    }
}
