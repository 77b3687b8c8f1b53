//! In-memory cache implementation for testing
//!
//! Stands in for Redis during integration tests so tier and session
//! caching can be exercised without a running Redis instance.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;

/// Entry in the in-memory cache with expiration
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| Instant::now() > exp).unwrap_or(false)
    }
}

/// In-memory cache with the same API as `RedisCache`
#[derive(Default)]
pub struct InMemoryCache {
    data: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let data = self.read();

        match data.get(key) {
            Some(entry) if !entry.is_expired() => {
                let parsed: T = serde_json::from_str(&entry.value)?;
                Ok(Some(parsed))
            }
            _ => Ok(None),
        }
    }

    /// Set a value in cache with a TTL (0 means no expiry)
    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        let serialized = serde_json::to_string(value)?;
        let expires_at = if ttl_seconds > 0 {
            Some(Instant::now() + Duration::from_secs(ttl_seconds))
        } else {
            None
        };

        self.write().insert(
            key.to_string(),
            CacheEntry {
                value: serialized,
                expires_at,
            },
        );
        Ok(())
    }

    /// Whether a live entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.read()
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }
}
