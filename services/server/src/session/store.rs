//! Session persistence backends

use async_trait::async_trait;
use common::{
    cache::RedisPool,
    error::CacheResult,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::models::SessionData;

/// Storage for session records keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session; expired or unknown ids yield `None`
    async fn load(&self, id: &str) -> CacheResult<Option<SessionData>>;

    /// Create or overwrite a session, expiring after `ttl`
    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> CacheResult<()>;

    /// Remove a session; unknown ids are not an error
    async fn destroy(&self, id: &str) -> CacheResult<()>;
}

/// Sessions stored as JSON strings in Redis, expired by key TTL
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
}

impl RedisSessionStore {
    pub fn new(redis_pool: RedisPool) -> Self {
        Self { redis_pool }
    }

    fn key(id: &str) -> String {
        format!("session:{}", id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> CacheResult<Option<SessionData>> {
        self.redis_pool.get_json(&Self::key(id)).await
    }

    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> CacheResult<()> {
        self.redis_pool
            .set_json(&Self::key(id), data, Some(ttl.as_secs().max(1)))
            .await
    }

    async fn destroy(&self, id: &str) -> CacheResult<()> {
        self.redis_pool.delete(&Self::key(id)).await
    }
}

/// Sessions kept in process memory
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<Mutex<HashMap<String, (SessionData, Instant)>>>,
}

impl MemorySessionStore {
    /// Number of live (unexpired) sessions
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, expires)| *expires > now);
        entries.len()
    }

    /// Whether there is no live session
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> CacheResult<Option<SessionData>> {
        let mut entries = self.entries.lock().await;

        match entries.get(id) {
            Some((data, expires)) if *expires > Instant::now() => Ok(Some(data.clone())),
            Some(_) => {
                entries.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, id: &str, data: &SessionData, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires)| *expires > now);
        entries.insert(id.to_string(), (data.clone(), now + ttl));
        Ok(())
    }

    async fn destroy(&self, id: &str) -> CacheResult<()> {
        self.entries.lock().await.remove(id);
        Ok(())
    }
}
