use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::UserId;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache. L2 is Redis and is optional: without a
/// Redis URL every operation only touches L1.
///
/// Every invalidation bumps a generation counter. A reader that captured the
/// generation before loading from the store writes back through
/// [`CacheManager::set_if_current`], which refuses the write once an
/// invalidation has happened in between.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
    generation: AtomicU64,
}

impl CacheManager {
    /// Create a cache manager, connecting to Redis when a URL is given
    pub async fn new(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let redis = match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = redis::aio::ConnectionManager::new(client).await?;
                Some(Arc::new(tokio::sync::Mutex::new(manager)))
            }
            None => None,
        };

        Ok(Self {
            redis,
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
            generation: AtomicU64::new(0),
        })
    }

    /// In-process cache only
    pub fn local(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
            generation: AtomicU64::new(0),
        }
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(l2) = &self.redis {
            let mut conn = l2.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);

                // Populate L1 cache
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(l2) = &self.redis {
            let mut conn = l2.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Current invalidation generation; capture it before reading the store
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Set a value unless an invalidation happened since `generation`
    ///
    /// Returns `Ok(false)` when the value was stale and was not kept.
    pub async fn set_if_current<T>(&self, key: &str, value: &T, generation: u64) -> Result<bool, CacheError>
    where
        T: Serialize,
    {
        if self.generation() != generation {
            tracing::trace!("Skipping stale cache write: {}", key);
            return Ok(false);
        }

        self.set(key, value).await?;

        // An invalidation that raced the write bumps first and deletes after,
        // so either it removes our entry or we see the new generation here
        if self.generation() != generation {
            self.delete(key).await?;
            tracing::trace!("Dropped stale cache write: {}", key);
            return Ok(false);
        }

        Ok(true)
    }

    /// Delete a value from every configured tier
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;

        if let Some(l2) = &self.redis {
            let mut conn = l2.lock().await;
            let _: () = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Drop cached match listings of every user taking part in a new match
    pub async fn invalidate_matches(&self, user_ids: &[UserId]) -> Result<(), CacheError> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        for user_id in user_ids {
            self.delete(&CacheKey::matches(*user_id)).await?;
        }
        Ok(())
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }
}

fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
    moka::future::CacheBuilder::new(l1_size)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a user's match listing
    pub fn matches(user_id: UserId) -> String {
        format!("matches:{}", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get_with_redis() {
        let cache = CacheManager::new(Some("redis://127.0.0.1:6379"), 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);

        cache.delete(key).await.unwrap();
        assert!(cache.get::<String>(key).await.is_err());
    }

    #[tokio::test]
    async fn test_local_cache_round_trip_and_invalidation() {
        let cache = CacheManager::local(100, 60);
        let key = CacheKey::matches(7);

        cache.set(&key, &vec![1_i64, 2, 3]).await.unwrap();
        let cached: Vec<i64> = cache.get(&key).await.unwrap();
        assert_eq!(cached, vec![1, 2, 3]);

        cache.invalidate_matches(&[7, 8]).await.unwrap();
        assert!(matches!(
            cache.get::<Vec<i64>>(&key).await,
            Err(CacheError::CacheMiss(_))
        ));
        assert!(!cache.has_redis());
    }

    #[tokio::test]
    async fn test_write_back_after_invalidation_is_dropped() {
        let cache = CacheManager::local(100, 60);
        let key = CacheKey::matches(1);

        // Reader captures the generation and loads an empty listing
        let generation = cache.generation();
        let stale: Vec<i64> = Vec::new();

        // A new match for users 1 and 2 lands before the reader writes back
        cache.invalidate_matches(&[1, 2]).await.unwrap();

        assert!(!cache.set_if_current(&key, &stale, generation).await.unwrap());
        assert!(cache.get::<Vec<i64>>(&key).await.is_err());

        // The next reader sees the current generation and is cached
        let generation = cache.generation();
        assert!(cache.set_if_current(&key, &vec![10_i64], generation).await.unwrap());
        let cached: Vec<i64> = cache.get(&key).await.unwrap();
        assert_eq!(cached, vec![10]);
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::matches(123), "matches:123");
    }
}
