//! Application configuration
//!
//! Settings are read from the process environment through the `config`
//! crate. `main` loads `config/.env` and `.env` first with `dotenvy`.
//! Storage connection settings live next to their pools in
//! [`common::database::DatabaseConfig`] and [`common::cache::RedisConfig`].

use axum::http::HeaderValue;
use oauth2::url::Url;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

use crate::models::Provider;

/// Shortest accepted `SESSION_SECRET`, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Deployment mode, reported at startup
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Development => f.write_str("development"),
            RunMode::Production => f.write_str("production"),
        }
    }
}

/// Where users and sessions are kept
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL for users, Redis for sessions
    #[default]
    Postgres,
    /// Process memory for both; nothing survives a restart
    Memory,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("SESSION_SECRET must be at least {} bytes long", MIN_SECRET_LEN)]
    WeakSecret,

    #[error("Invalid {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
}

/// Client credentials for one OAuth provider
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub run_mode: RunMode,
    pub session_secret: String,
    /// Public URL of the frontend; CORS origin and default redirect target
    pub frontend_url: String,
    /// Public URL of this server; base of the OAuth callback URLs
    pub base_url: String,
    pub store_backend: StoreBackend,
    pub session_cookie_secure: bool,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PORT`: listen port (default: 8000)
    /// - `RUN_MODE`: `development` or `production` (default: development)
    /// - `SESSION_SECRET`: cookie signing secret, at least 32 bytes (required)
    /// - `FRONTEND_URL`: frontend base URL (required)
    /// - `BASE_URL`: public URL of this server (required)
    /// - `STORE_BACKEND`: `postgres` or `memory` (default: postgres)
    /// - `SESSION_COOKIE_SECURE`: set the `Secure` cookie attribute (default: false)
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: enable Google sign-in
    /// - `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET`: enable GitHub sign-in
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .set_default("port", 8000)?
            .set_default("run_mode", "development")?
            .set_default("store_backend", "postgres")?
            .set_default("session_cookie_secure", false)?
            .add_source(config::Environment::default())
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.frontend_url = config.frontend_url.trim_end_matches('/').to_string();
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        config.validate()?;

        Ok(config)
    }

    /// Check the settings that would otherwise fail at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        parse_url("FRONTEND_URL", &self.frontend_url)?;
        parse_url("BASE_URL", &self.base_url)?;
        self.cors_origin()?;

        // Both end up in `Location` headers
        for (name, url) in [
            ("FRONTEND_URL", self.login_url()),
            ("BASE_URL", self.callback_url(Provider::GitHub)),
        ] {
            HeaderValue::from_str(&url).map_err(|e| ConfigError::InvalidUrl {
                name,
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Origin of the frontend, as sent in `Access-Control-Allow-Origin`
    pub fn cors_origin(&self) -> Result<HeaderValue, ConfigError> {
        let url = parse_url("FRONTEND_URL", &self.frontend_url)?;
        let origin = url.origin().ascii_serialization();

        HeaderValue::from_str(&origin).map_err(|e| ConfigError::InvalidUrl {
            name: "FRONTEND_URL",
            reason: e.to_string(),
        })
    }

    /// Frontend page users are sent to when they must sign in
    pub fn login_url(&self) -> String {
        format!("{}/login", self.frontend_url)
    }

    /// Callback registered with the provider
    pub fn callback_url(&self, provider: Provider) -> String {
        format!("{}/auth/{}/callback", self.base_url, provider.as_str())
    }

    /// Client credentials for a provider, if both halves are configured
    pub fn oauth_credentials(&self, provider: Provider) -> Option<OAuthCredentials> {
        let (id, secret) = match provider {
            Provider::Google => (&self.google_client_id, &self.google_client_secret),
            Provider::GitHub => (&self.github_client_id, &self.github_client_secret),
            Provider::Local => return None,
        };

        match (id.as_deref(), secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(OAuthCredentials {
                    client_id: id.to_string(),
                    client_secret: secret.to_string(),
                })
            }
            _ => None,
        }
    }

    /// Canonical form of a post-login redirect target, if it stays on the
    /// frontend or on this server
    ///
    /// The result is a serialized [`Url`], so it is plain ASCII and always a
    /// valid `Location` header.
    pub fn return_target(&self, target: &str) -> Option<String> {
        let url = Url::parse(target).ok()?;
        let origin = url.origin();

        let allowed = [&self.frontend_url, &self.base_url]
            .iter()
            .filter_map(|base| Url::parse(base).ok())
            .any(|base| base.origin() == origin);

        allowed.then(|| url.to_string())
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PORT",
        "RUN_MODE",
        "SESSION_SECRET",
        "FRONTEND_URL",
        "BASE_URL",
        "STORE_BACKEND",
        "SESSION_COOKIE_SECURE",
        "GOOGLE_CLIENT_ID",
        "GOOGLE_CLIENT_SECRET",
        "GITHUB_CLIENT_ID",
        "GITHUB_CLIENT_SECRET",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    fn set_required_env() {
        unsafe {
            std::env::set_var("SESSION_SECRET", "0123456789abcdef0123456789abcdef");
            std::env::set_var("FRONTEND_URL", "http://localhost:3000/");
            std::env::set_var("BASE_URL", "http://localhost:8000");
        }
    }

    fn sample() -> AppConfig {
        AppConfig {
            port: 8000,
            run_mode: RunMode::Development,
            session_secret: "0123456789abcdef0123456789abcdef".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            base_url: "http://localhost:8000".to_string(),
            store_backend: StoreBackend::Memory,
            session_cookie_secure: false,
            google_client_id: Some("id".to_string()),
            google_client_secret: Some("secret".to_string()),
            github_client_id: Some("id".to_string()),
            github_client_secret: None,
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        set_required_env();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.run_mode, RunMode::Development);
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert!(!config.session_cookie_secure);
        assert_eq!(config.frontend_url, "http://localhost:3000");
        assert!(config.google_client_id.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_with_custom_values() {
        clear_env();
        set_required_env();
        unsafe {
            std::env::set_var("PORT", "9100");
            std::env::set_var("RUN_MODE", "production");
            std::env::set_var("STORE_BACKEND", "memory");
            std::env::set_var("SESSION_COOKIE_SECURE", "true");
            std::env::set_var("GITHUB_CLIENT_ID", "gh-id");
            std::env::set_var("GITHUB_CLIENT_SECRET", "gh-secret");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.run_mode, RunMode::Production);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.session_cookie_secure);
        assert!(config.oauth_credentials(Provider::GitHub).is_some());
        assert!(config.oauth_credentials(Provider::Google).is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_short_secret() {
        clear_env();
        set_required_env();
        unsafe {
            std::env::set_var("SESSION_SECRET", "keyboard cat");
        }

        assert!(matches!(AppConfig::from_env(), Err(ConfigError::WeakSecret)));

        clear_env();
    }

    #[test]
    fn test_cors_origin_strips_path() {
        let mut config = sample();
        config.frontend_url = "https://notes.example.com/app".to_string();
        assert_eq!(
            config.cors_origin().unwrap(),
            HeaderValue::from_static("https://notes.example.com")
        );
    }

    #[test]
    fn test_derived_urls() {
        let config = sample();
        assert_eq!(config.login_url(), "http://localhost:3000/login");
        assert_eq!(
            config.callback_url(Provider::Google),
            "http://localhost:8000/auth/google/callback"
        );
    }

    #[test]
    fn test_oauth_credentials_need_both_halves() {
        let config = sample();
        assert!(config.oauth_credentials(Provider::Google).is_some());
        assert!(config.oauth_credentials(Provider::GitHub).is_none());
        assert!(config.oauth_credentials(Provider::Local).is_none());
    }

    #[test]
    fn test_return_targets_must_stay_on_known_origins() {
        let config = sample();
        assert_eq!(
            config.return_target("http://localhost:3000").as_deref(),
            Some("http://localhost:3000/")
        );
        assert_eq!(
            config.return_target("http://localhost:3000/notes/1?x=1").as_deref(),
            Some("http://localhost:3000/notes/1?x=1")
        );
        assert!(config.return_target("http://localhost:8000/notes/new").is_some());
        assert!(config.return_target("http://localhost:3000.evil.com/").is_none());
        assert!(config.return_target("https://evil.com/?http://localhost:3000").is_none());
        assert!(config.return_target("https://localhost:3000/").is_none());
        assert!(config.return_target("javascript:alert(1)").is_none());
        assert!(config.return_target("/notes/1").is_none());
    }

    #[test]
    fn test_return_targets_are_valid_header_values() {
        let config = sample();
        for target in [
            "http://localhost:3000/\nx",
            "http://localhost:3000/caf\u{e9}?q=\u{1}",
            "http://localhost:3000/a b\"<>",
        ] {
            let normalized = config.return_target(target).unwrap();
            assert!(HeaderValue::from_str(&normalized).is_ok(), "{:?}", normalized);
        }
        assert_eq!(
            config.return_target("http://localhost:3000/\nx").as_deref(),
            Some("http://localhost:3000/x")
        );
    }

    #[test]
    fn test_frontend_url_must_fit_in_a_header() {
        let mut config = sample();
        config.frontend_url = "http://localhost:3000/caf\u{e9}".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
