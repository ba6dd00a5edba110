//! Authentication strategies
//!
//! Every way of signing in implements [`Authenticator`]: it turns a set of
//! [`Credentials`] into an [`Identity`] or fails with an [`AuthError`].
//! [`LocalStrategy`] checks an email and password against the user store,
//! and [`OAuthClient`] completes an authorization code flow with Google or
//! GitHub. [`resolve_user`] maps an identity to the account it belongs to.

use async_trait::async_trait;
use common::error::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{Provider, User},
    repositories::UserStore,
};

pub mod local;
pub mod oauth;
pub mod password;

pub use local::LocalStrategy;
pub use oauth::{OAuthClient, OAuthError};

/// Input accepted by a strategy
pub enum Credentials {
    /// Email and password for the local strategy
    Password { email: String, password: String },
    /// Authorization code returned to an OAuth callback, with the PKCE
    /// verifier saved when the handshake started
    AuthorizationCode { code: String, pkce_verifier: String },
}

/// Who the strategy says the user is
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub provider: Provider,
    /// Provider-scoped account id; the user id for local accounts
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Username and password do not match")]
    InvalidCredentials,

    #[error("The {0} strategy does not accept these credentials")]
    UnsupportedCredentials(Provider),

    #[error("A user account with that email already exists")]
    EmailTaken,

    #[error("The account for {0} cannot be linked to this sign-in")]
    AccountConflict(String),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("User store error: {0}")]
    Store(#[from] DatabaseError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// A pluggable authentication method
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Provider this strategy signs users in with
    fn provider(&self) -> Provider;

    /// Verify the credentials and return the identity they prove
    async fn authenticate(&self, credentials: Credentials) -> Result<Identity, AuthError>;
}

/// Find or create the account an identity belongs to
///
/// Local identities must point at an existing user. OAuth identities are
/// found by provider id, may join an OAuth-only account with the same email,
/// and create an account otherwise. They never take over a password account.
pub async fn resolve_user(users: &dyn UserStore, identity: &Identity) -> Result<User, AuthError> {
    match identity.provider {
        Provider::Local => {
            let id =
                Uuid::parse_str(&identity.subject).map_err(|_| AuthError::InvalidCredentials)?;
            users
                .find_by_id(id)
                .await?
                .ok_or(AuthError::InvalidCredentials)
        }
        provider => match users
            .upsert_oauth(provider, &identity.subject, &identity.email)
            .await
        {
            Ok(user) => Ok(user),
            Err(DatabaseError::UniqueViolation(_)) => {
                Err(AuthError::AccountConflict(identity.email.clone()))
            }
            Err(e) => Err(e.into()),
        },
    }
}
