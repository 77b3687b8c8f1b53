//! Cache module
//!
//! JSON caching for resolved subscription tiers and sessions.

pub mod redis;

#[cfg(any(test, feature = "test-utils"))]
pub mod in_memory;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppResult;

pub use self::redis::RedisCache;

#[cfg(any(test, feature = "test-utils"))]
pub use self::in_memory::InMemoryCache;

/// Cache backend shared by the tier and session caches
#[derive(Clone)]
pub enum CacheBackend {
    /// Redis-based cache for production use
    Redis(Arc<RedisCache>),
    /// In-memory cache for testing
    #[cfg(any(test, feature = "test-utils"))]
    InMemory(Arc<InMemoryCache>),
}

impl CacheBackend {
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self {
            CacheBackend::Redis(cache) => cache.get(key).await,
            #[cfg(any(test, feature = "test-utils"))]
            CacheBackend::InMemory(cache) => cache.get(key).await,
        }
    }

    pub async fn set_with_ttl<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> AppResult<()> {
        match self {
            CacheBackend::Redis(cache) => cache.set_with_ttl(key, value, ttl_seconds).await,
            #[cfg(any(test, feature = "test-utils"))]
            CacheBackend::InMemory(cache) => cache.set_with_ttl(key, value, ttl_seconds).await,
        }
    }
}
