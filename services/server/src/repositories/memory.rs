//! In-process user store

use async_trait::async_trait;
use chrono::Utc;
use common::error::{DatabaseError, DatabaseResult};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::UserStore;
use crate::models::{NewUser, Provider, User};

/// User store kept in memory; contents are lost on restart
#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserRepository {
    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether no account has been stored yet
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn provider_id_mut(user: &mut User, provider: Provider) -> Option<&mut Option<String>> {
    match provider {
        Provider::Google => Some(&mut user.google_id),
        Provider::GitHub => Some(&mut user.github_id),
        Provider::Local => None,
    }
}

#[async_trait]
impl UserStore for MemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new_user: &NewUser) -> DatabaseResult<User> {
        // The write lock makes check and insert one step, like a unique index
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            google_id: None,
            github_id: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn upsert_oauth(
        &self,
        provider: Provider,
        provider_id: &str,
        email: &str,
    ) -> DatabaseResult<User> {
        let mut users = self.users.write().await;

        let linked = users.values().find(|u| match provider {
            Provider::Google => u.google_id.as_deref() == Some(provider_id),
            Provider::GitHub => u.github_id.as_deref() == Some(provider_id),
            Provider::Local => false,
        });
        if let Some(user) = linked {
            return Ok(user.clone());
        }

        if let Some(user) = users.values_mut().find(|u| u.email == email) {
            let has_password = user.password_hash.is_some();
            let slot = provider_id_mut(user, provider).ok_or_else(|| {
                DatabaseError::Configuration(
                    "local accounts are not linked by provider id".to_string(),
                )
            })?;
            // Same rule as the conditional upsert in PostgreSQL
            if has_password || slot.is_some() {
                return Err(DatabaseError::UniqueViolation("users_email_key".to_string()));
            }
            *slot = Some(provider_id.to_string());
            user.updated_at = Utc::now();
            return Ok(user.clone());
        }

        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: None,
            google_id: None,
            github_id: None,
            created_at: now,
            updated_at: now,
        };
        let slot = provider_id_mut(&mut user, provider).ok_or_else(|| {
            DatabaseError::Configuration("local accounts are not linked by provider id".to_string())
        })?;
        *slot = Some(provider_id.to_string());
        users.insert(user.id, user.clone());
        Ok(user)
    }
}
