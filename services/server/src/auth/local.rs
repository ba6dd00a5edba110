//! Email and password strategy

use async_trait::async_trait;
use common::error::DatabaseError;
use std::sync::Arc;
use tracing::info;

use super::{AuthError, Authenticator, Credentials, Identity, password};
use crate::{
    models::{NewUser, Provider, User},
    repositories::UserStore,
};

/// Credential verifier backed by the user store
#[derive(Clone)]
pub struct LocalStrategy {
    users: Arc<dyn UserStore>,
}

impl LocalStrategy {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create an account for a (normalized) email
    ///
    /// The lookup only produces the friendly error; the store's unique
    /// constraint settles concurrent signups for the same email.
    pub async fn signup(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = password::hash_password(password.to_string()).await?;
        let new_user = NewUser {
            email: email.to_string(),
            password_hash: Some(password_hash),
        };

        match self.users.create(&new_user).await {
            Ok(user) => {
                info!("Created local account: {}", user.id);
                Ok(user)
            }
            Err(DatabaseError::UniqueViolation(_)) => Err(AuthError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Authenticator for LocalStrategy {
    fn provider(&self) -> Provider {
        Provider::Local
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<Identity, AuthError> {
        let Credentials::Password { email, password } = credentials else {
            return Err(AuthError::UnsupportedCredentials(Provider::Local));
        };

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        // Accounts created through OAuth have no password
        let Some(hash) = user.password_hash.clone() else {
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify_password(password, hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Identity {
            provider: Provider::Local,
            subject: user.id.to_string(),
            email: user.email,
            name: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryUserRepository;

    fn strategy() -> (LocalStrategy, MemoryUserRepository) {
        let users = MemoryUserRepository::default();
        (LocalStrategy::new(Arc::new(users.clone())), users)
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials::Password {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_authenticate() {
        let (local, _) = strategy();
        let user = local.signup("a@x.com", "p").await.unwrap();

        let identity = local.authenticate(creds("a@x.com", "p")).await.unwrap();
        assert_eq!(identity.provider, Provider::Local);
        assert_eq!(identity.subject, user.id.to_string());
    }

    #[tokio::test]
    async fn test_signup_rejects_existing_email() {
        let (local, users) = strategy();
        local.signup("a@x.com", "p").await.unwrap();

        let err = local.signup("a@x.com", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
        assert_eq!(users.len().await, 1);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let (local, _) = strategy();
        local.signup("a@x.com", "p").await.unwrap();

        let wrong = local.authenticate(creds("a@x.com", "nope")).await;
        let unknown = local.authenticate(creds("b@x.com", "p")).await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_oauth_only_account_cannot_use_password() {
        let (local, users) = strategy();
        users
            .upsert_oauth(Provider::GitHub, "7", "a@x.com")
            .await
            .unwrap();

        let result = local.authenticate(creds("a@x.com", "")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_rejects_authorization_codes() {
        let (local, _) = strategy();
        let result = local
            .authenticate(Credentials::AuthorizationCode {
                code: "c".to_string(),
                pkce_verifier: "v".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(AuthError::UnsupportedCredentials(Provider::Local))
        ));
    }
}
