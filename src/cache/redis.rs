//! Redis cache implementation
//!
//! Stores JSON-encoded values with a TTL.

use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;

/// Redis cache wrapper
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Create a new Redis cache
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => {
                let parsed: T = serde_json::from_str(&v)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a value in cache with a TTL
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let serialized = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, serialized, ttl_seconds).await?;
        Ok(())
    }
}

/// Cache key prefixes
pub mod keys {
    /// Resolved subscription tier cache key
    pub fn subscription_tier(user_id: &str) -> String {
        format!("meter:tier:{}", user_id)
    }

    /// Resolved session cache key
    pub fn session(token_hash: &str) -> String {
        format!("meter:session:{}", token_hash)
    }
}
