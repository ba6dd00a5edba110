//! User model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Provider;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string, absent for accounts created through OAuth
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub github_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Providers this account can sign in with
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers = Vec::new();
        if self.password_hash.is_some() {
            providers.push(Provider::Local);
        }
        if self.google_id.is_some() {
            providers.push(Provider::Google);
        }
        if self.github_id.is_some() {
            providers.push(Provider::GitHub);
        }
        providers
    }

    /// Convert to the profile returned by the API
    pub fn to_info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            email: self.email.clone(),
            providers: self.providers(),
        }
    }
}

/// New user creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
}

/// User profile safe to send to the frontend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub providers: Vec<Provider>,
}

/// Email and password submitted to `/login` and `/signup`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
