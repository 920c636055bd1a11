//! Redis access for session and token state
//!
//! The auth service keeps refresh-token sessions and the token blacklist in
//! Redis so revocation is visible to every instance immediately.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::info;

/// Configuration for the Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Build a RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Ok(RedisConfig { url })
    }
}

/// Redis connection handle shared across handlers
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Connect to Redis
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Store a key-value pair, optionally expiring after `ttl_seconds`
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.connection().await?;
        match ttl_seconds {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    /// Fetch a value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    /// Delete a key, returning whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    /// Delete every key matching `pattern` (SCAN-based, non-blocking)
    ///
    /// Used to drop all of a user's session keys when a password change
    /// forces re-login.
    pub async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.connection().await?;
        let keys: Vec<String> = {
            let mut iter = conn.scan_match::<_, String>(pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: u64 = conn.del(&keys).await?;
        Ok(removed)
    }

    /// Check Redis reachability
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_pool_config() -> RedisConfig {
        RedisConfig {
            url: "redis://localhost:6379".to_string(),
        }
    }

    #[tokio::test]
    #[ignore = "requires a local Redis instance"]
    async fn test_set_get_delete() -> Result<()> {
        let pool = RedisPool::new(&local_pool_config()).await?;

        pool.set("cache_test_key", "cache_test_value", Some(10))
            .await?;
        assert_eq!(
            pool.get("cache_test_key").await?,
            Some("cache_test_value".to_string())
        );

        assert!(pool.delete("cache_test_key").await?);
        assert_eq!(pool.get("cache_test_key").await?, None);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a local Redis instance"]
    async fn test_delete_matching() -> Result<()> {
        let pool = RedisPool::new(&local_pool_config()).await?;

        pool.set("cache_test:match:1", "a", Some(10)).await?;
        pool.set("cache_test:match:2", "b", Some(10)).await?;

        let removed = pool.delete_matching("cache_test:match:*").await?;
        assert_eq!(removed, 2);
        Ok(())
    }
}
