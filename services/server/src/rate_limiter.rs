//! Login throttling to slow down password guessing

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    /// Neither the window nor a ban still applies
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        let banned = self.ban_expires.is_some_and(|expires| now < expires);
        !banned && now.duration_since(self.window_start) >= window
    }
}

/// Per-key attempt counter with a fixed window and a ban once exceeded
///
/// Keys are normalized emails; an attempt is recorded by [`check`] before
/// the password is verified and forgotten by [`reset`] once it succeeds.
///
/// [`check`]: RateLimiter::check
/// [`reset`]: RateLimiter::reset
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key`, returning whether it may proceed
    pub async fn check(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        // Drop keys nobody has tried recently so the map only holds live state
        entries.retain(|_, entry| !entry.is_stale(now, window));

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.ban_expires = None;
            entry.window_start = now;
        }

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Banned login key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget all attempts for `key`
    pub async fn reset(&self, key: &str) {
        if self.entries.lock().await.remove(key).is_some() {
            info!("Cleared login attempts for {}", key);
        }
    }

    /// Number of keys currently tracked
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no key is tracked
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, window_seconds: u64, ban_duration_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds,
            ban_duration_seconds,
        })
    }

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let limiter = RateLimiter::default();
        for _ in 0..5 {
            assert!(limiter.check("a@x.com").await);
        }
        assert!(!limiter.check("a@x.com").await);
        // Still banned on the next call
        assert!(!limiter.check("a@x.com").await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1, 300, 3600);
        assert!(limiter.check("a@x.com").await);
        assert!(!limiter.check("a@x.com").await);
        assert!(limiter.check("b@x.com").await);
    }

    #[tokio::test]
    async fn test_reset_clears_attempts() {
        let limiter = limiter(2, 300, 3600);
        assert!(limiter.check("a@x.com").await);
        assert!(limiter.check("a@x.com").await);
        limiter.reset("a@x.com").await;
        assert!(limiter.check("a@x.com").await);
    }

    #[tokio::test]
    async fn test_ban_expires() {
        let limiter = limiter(1, 300, 0);
        assert!(limiter.check("a@x.com").await);
        assert!(!limiter.check("a@x.com").await);
        assert!(limiter.check("a@x.com").await);
    }

    #[tokio::test]
    async fn test_stale_keys_are_pruned() {
        let limiter = limiter(5, 0, 0);
        for i in 0..1000 {
            assert!(limiter.check(&format!("user{}@x.com", i)).await);
        }
        assert_eq!(limiter.len().await, 1);
    }

    #[tokio::test]
    async fn test_pruning_keeps_active_bans() {
        let limiter = limiter(1, 1, 3600);
        assert!(limiter.check("a@x.com").await);
        assert!(!limiter.check("a@x.com").await);

        // Past the window, but the ban still holds
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(limiter.check("b@x.com").await);
        assert_eq!(limiter.len().await, 2);
        assert!(!limiter.check("a@x.com").await);
    }

    #[tokio::test]
    async fn test_window_expiry_resets_count() {
        let limiter = limiter(1, 0, 3600);
        assert!(limiter.check("a@x.com").await);
        assert!(limiter.check("a@x.com").await);
    }
}
