//! OAuth2 integration for Google and GitHub providers

use async_trait::async_trait;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
    reqwest::async_http_client,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::{AuthError, Authenticator, Credentials, Identity};
use crate::{config::OAuthCredentials, models::Provider};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";
const GITHUB_EMAILS_URL: &str = "https://api.github.com/user/emails";

const USER_AGENT: &str = "sticky-notes-server";

/// OAuth handshake failures
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("{0} is not an OAuth provider")]
    UnsupportedProvider(Provider),

    #[error("{0} sign-in is not configured")]
    NotConfigured(Provider),

    #[error("Invalid OAuth endpoint: {0}")]
    InvalidUrl(#[from] oauth2::url::ParseError),

    #[error("Provider denied the request: {0}")]
    Denied(String),

    #[error("No OAuth handshake is pending for this session")]
    NoPendingHandshake,

    #[error("OAuth state does not match the pending handshake")]
    StateMismatch,

    #[error("Callback is missing the authorization code")]
    MissingCode,

    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Profile request failed: {0}")]
    Profile(#[from] reqwest::Error),

    #[error("Provider returned no verified email address")]
    MissingEmail,
}

/// OAuth2 configuration for a provider
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    /// Profile endpoint called with the access token
    pub profile_url: String,
    /// Email list consulted when the profile has no public email (GitHub)
    pub emails_url: Option<String>,
}

impl OAuthConfig {
    /// Google endpoints with the given client credentials
    pub fn google(credentials: OAuthCredentials, redirect_url: String) -> Self {
        Self {
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            redirect_url,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            profile_url: GOOGLE_USERINFO_URL.to_string(),
            emails_url: None,
        }
    }

    /// GitHub endpoints with the given client credentials
    pub fn github(credentials: OAuthCredentials, redirect_url: String) -> Self {
        Self {
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            redirect_url,
            auth_url: GITHUB_AUTH_URL.to_string(),
            token_url: GITHUB_TOKEN_URL.to_string(),
            profile_url: GITHUB_USER_URL.to_string(),
            emails_url: Some(GITHUB_EMAILS_URL.to_string()),
        }
    }
}

/// OAuth2 client wrapper
#[derive(Clone)]
pub struct OAuthClient {
    provider: Provider,
    client: BasicClient,
    http: reqwest::Client,
    profile_url: String,
    emails_url: Option<String>,
}

impl OAuthClient {
    /// Create a new OAuth2 client for Google or GitHub
    pub fn new(provider: Provider, config: OAuthConfig) -> Result<Self, OAuthError> {
        if provider == Provider::Local {
            return Err(OAuthError::UnsupportedProvider(provider));
        }

        let client = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            AuthUrl::new(config.auth_url)?,
            Some(TokenUrl::new(config.token_url)?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_url)?);

        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            provider,
            client,
            http,
            profile_url: config.profile_url,
            emails_url: config.emails_url,
        })
    }

    /// Get the provider
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Generate the consent screen URL with a fresh CSRF state and PKCE pair
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        info!("Generating authorization URL for {}", self.provider);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge);

        request = match self.provider {
            Provider::Google => request
                .add_scope(Scope::new("profile".to_string()))
                .add_scope(Scope::new("email".to_string()))
                .add_extra_param("access_type", "offline")
                .add_extra_param("prompt", "consent"),
            _ => request
                .add_scope(Scope::new("read:user".to_string()))
                .add_scope(Scope::new("user:email".to_string())),
        };

        let (auth_url, csrf_token) = request.url();

        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchange an authorization code for an access token
    async fn exchange_code(&self, code: String, pkce_verifier: String) -> Result<String, OAuthError> {
        info!("Exchanging authorization code for {}", self.provider);

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        Ok(token_response.access_token().secret().clone())
    }

    /// Get user profile information from the provider
    async fn get_user_profile(&self, access_token: &str) -> Result<Identity, OAuthError> {
        match self.provider {
            Provider::GitHub => self.get_github_user_profile(access_token).await,
            _ => self.get_google_user_profile(access_token).await,
        }
    }

    async fn get_google_user_profile(&self, access_token: &str) -> Result<Identity, OAuthError> {
        let google_user: GoogleUser = self
            .http
            .get(&self.profile_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let email = google_user
            .email
            .filter(|_| google_user.verified_email)
            .ok_or(OAuthError::MissingEmail)?;

        Ok(Identity {
            provider: Provider::Google,
            subject: google_user.id,
            email: email.to_lowercase(),
            name: google_user.name,
        })
    }

    async fn get_github_user_profile(&self, access_token: &str) -> Result<Identity, OAuthError> {
        let github_user: GitHubUser = self
            .http
            .get(&self.profile_url)
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // The public profile email is optional; fall back to the primary
        // verified address
        let email = match github_user.email {
            Some(email) => email,
            None => {
                let emails_url = self.emails_url.as_deref().ok_or(OAuthError::MissingEmail)?;
                let emails: Vec<GitHubEmail> = self
                    .http
                    .get(emails_url)
                    .bearer_auth(access_token)
                    .header("Accept", "application/vnd.github+json")
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;

                primary_verified_email(emails).ok_or(OAuthError::MissingEmail)?
            }
        };

        Ok(Identity {
            provider: Provider::GitHub,
            subject: github_user.id.to_string(),
            email: email.to_lowercase(),
            name: github_user.name.or(Some(github_user.login)),
        })
    }
}

#[async_trait]
impl Authenticator for OAuthClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<Identity, AuthError> {
        let Credentials::AuthorizationCode {
            code,
            pkce_verifier,
        } = credentials
        else {
            return Err(AuthError::UnsupportedCredentials(self.provider));
        };

        let access_token = self.exchange_code(code, pkce_verifier).await?;
        let identity = self.get_user_profile(&access_token).await?;
        info!("{} identity verified: {}", self.provider, identity.subject);

        Ok(identity)
    }
}

fn primary_verified_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

/// Google user profile response
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
    name: Option<String>,
}

/// GitHub user profile response
#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    email: Option<String>,
    name: Option<String>,
}

/// GitHub `/user/emails` entry
#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}
