//! Ephemeral key-value cache for refresh entries and password-reset codes.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::{aio::ConnectionManager, Client};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::RedisConfig;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache error: {0}")]
    Backend(anyhow::Error),
}

#[async_trait]
pub trait EphemeralCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Atomically read and remove a key. At most one caller observes the value.
    async fn take(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn health_check(&self) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct RedisCache {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn new(config: &RedisConfig) -> Result<Self, CacheError> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // Use ConnectionManager for automatic reconnection
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            CacheError::Redis(e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl EphemeralCache for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let millis = ttl.as_millis().max(1) as u64;

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        let value = redis::cmd("GETDEL")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!("Redis health check failed: {}", e);
                CacheError::Redis(e)
            })?;
        Ok(())
    }
}

/// In-process cache with per-entry expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().1 > Instant::now())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EphemeralCache for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.entries.get(key) {
            Some(entry) if entry.1 > Instant::now() => return Ok(Some(entry.0.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        // Expired: drop it, unless a concurrent set replaced it meanwhile.
        self.entries
            .remove_if(key, |_, (_, expires)| *expires <= Instant::now());
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, (_, expires))| *expires > Instant::now())
            .map(|(_, (value, _))| value))
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
