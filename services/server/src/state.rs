//! Shared application state

use anyhow::Context;
use axum::{extract::FromRef, http::HeaderValue};
use axum_extra::extract::cookie::Key;
use common::{
    cache::{RedisConfig, RedisPool},
    database::{self, DatabaseConfig},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use crate::{
    auth::{
        LocalStrategy, OAuthClient,
        oauth::{OAuthConfig, OAuthError},
    },
    config::{AppConfig, StoreBackend},
    models::Provider,
    rate_limiter::RateLimiter,
    repositories::{MemoryUserRepository, PgUserRepository, UserStore},
    session::{MemorySessionStore, RedisSessionStore, SessionManager, SessionStore},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionManager,
    pub local: LocalStrategy,
    pub google: Option<Arc<OAuthClient>>,
    pub github: Option<Arc<OAuthClient>>,
    pub rate_limiter: RateLimiter,
    pub cors_origin: HeaderValue,
    cookie_key: Key,
    db_pool: Option<PgPool>,
}

impl AppState {
    /// Connect the configured backends and build the state
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        match config.store_backend {
            StoreBackend::Memory => {
                info!("Using in-memory user and session stores");
                Self::with_stores(
                    config,
                    Arc::new(MemoryUserRepository::default()),
                    Arc::new(MemorySessionStore::default()),
                )
            }
            StoreBackend::Postgres => {
                let db_config = DatabaseConfig::from_env()?;
                let pool = database::init_pool(&db_config)
                    .await
                    .context("Failed to connect to database")?;

                if !database::health_check(&pool).await? {
                    anyhow::bail!("Database health check failed");
                }
                database::ensure_schema(&pool).await?;
                info!("Database connection successful");

                let redis_config = RedisConfig::from_env()?;
                let redis_pool = RedisPool::new(&redis_config)
                    .await
                    .context("Failed to connect to session store")?;

                if !redis_pool.health_check().await? {
                    anyhow::bail!("Session store health check failed");
                }
                info!("Session store connection successful");

                let mut state = Self::with_stores(
                    config,
                    Arc::new(PgUserRepository::new(pool.clone())),
                    Arc::new(RedisSessionStore::new(redis_pool)),
                )?;
                state.db_pool = Some(pool);
                Ok(state)
            }
        }
    }

    /// Build the state around already constructed stores
    pub fn with_stores(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let google = oauth_client(&config, Provider::Google)?;
        let github = oauth_client(&config, Provider::GitHub)?;

        Ok(Self {
            cookie_key: Key::derive_from(config.session_secret.as_bytes()),
            cors_origin: config.cors_origin()?,
            sessions: SessionManager::new(sessions, config.session_cookie_secure),
            local: LocalStrategy::new(users.clone()),
            rate_limiter: RateLimiter::default(),
            users,
            google,
            github,
            config: Arc::new(config),
            db_pool: None,
        })
    }

    /// OAuth client for a provider, if it is configured
    pub fn oauth_client(&self, provider: Provider) -> Result<Arc<OAuthClient>, OAuthError> {
        let client = match provider {
            Provider::Google => self.google.as_ref(),
            Provider::GitHub => self.github.as_ref(),
            Provider::Local => return Err(OAuthError::UnsupportedProvider(provider)),
        };

        client.cloned().ok_or(OAuthError::NotConfigured(provider))
    }

    /// Key used to sign the session cookie
    pub fn cookie_key(&self) -> Key {
        self.cookie_key.clone()
    }

    /// Release the database pool
    pub async fn shutdown(&self) {
        if let Some(pool) = &self.db_pool {
            pool.close().await;
            info!("Database pool closed");
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key()
    }
}

fn oauth_client(
    config: &AppConfig,
    provider: Provider,
) -> Result<Option<Arc<OAuthClient>>, OAuthError> {
    let Some(credentials) = config.oauth_credentials(provider) else {
        info!("{} sign-in disabled: client credentials not set", provider);
        return Ok(None);
    };

    let callback = config.callback_url(provider);
    let oauth_config = match provider {
        Provider::GitHub => OAuthConfig::github(credentials, callback),
        _ => OAuthConfig::google(credentials, callback),
    };

    Ok(Some(Arc::new(OAuthClient::new(provider, oauth_config)?)))
}
