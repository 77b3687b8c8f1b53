//! Homegoods meter - affiliate click tracking and chat usage metering
//!
//! This library provides the core of the meter service: monthly chat-session
//! quotas per subscription tier, fire-and-forget affiliate click recording,
//! and the HTTP surface over both.

pub mod auth;
pub mod billing;
pub mod cache;
pub mod clicks;
pub mod config;
pub mod error;
pub mod middleware;
pub mod period;
pub mod routes;
pub mod store;
pub mod usage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::billing::{BillingClient, SubscriptionTierCache, TierResolver};
pub use crate::cache::{CacheBackend, RedisCache};
pub use crate::clicks::{ClickRecorder, ClickRecorderConfig};
pub use crate::config::Config;
pub use crate::period::BillingPeriod;
pub use crate::store::{MeterStore, RedisStore};
pub use crate::usage::{ChatLimits, UsageMeter};

use crate::auth::{AuthClient, SessionCache, SessionResolver};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    pub store: Arc<dyn MeterStore>,
    pub sessions: Arc<dyn SessionResolver>,
    pub usage_meter: Arc<UsageMeter>,
    /// Background click writer; shut down after the server stops
    pub click_recorder: Arc<ClickRecorder>,
}

impl AppState {
    /// Create a new application state backed by Redis
    pub async fn new(config: Config) -> Result<Self> {
        let redis_client = redis::Client::open(config.redis_url.as_str())?;
        let redis = redis::aio::ConnectionManager::new(redis_client).await?;

        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .timeout(Duration::from_millis(config.collaborator_timeout_ms))
            .build()?;

        let store: Arc<dyn MeterStore> = Arc::new(RedisStore::new(redis.clone()));
        let cache = CacheBackend::Redis(Arc::new(RedisCache::new(redis)));

        Ok(Self::assemble(config, store, cache, http_client))
    }

    /// Create an application state over in-memory storage
    ///
    /// Billing and auth clients still talk HTTP to the configured URLs, so
    /// tests point them at wiremock servers.
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn new_for_testing(config: Config, store: Arc<dyn MeterStore>) -> Self {
        let cache = CacheBackend::InMemory(Arc::new(cache::InMemoryCache::new()));
        Self::assemble(config, store, cache, reqwest::Client::new())
    }

    fn assemble(
        config: Config,
        store: Arc<dyn MeterStore>,
        cache: CacheBackend,
        http_client: reqwest::Client,
    ) -> Self {
        let lookup_timeout = Duration::from_millis(config.collaborator_timeout_ms);

        let billing_client = Arc::new(BillingClient::new(
            http_client.clone(),
            &config.billing_api_url,
            &config.billing_api_key,
        ));
        let tiers: Arc<dyn TierResolver> = Arc::new(SubscriptionTierCache::new(
            cache.clone(),
            billing_client,
            config.tier_cache_ttl_seconds,
            lookup_timeout,
        ));

        let auth_client = Arc::new(AuthClient::new(http_client, &config.auth_api_url));
        let sessions: Arc<dyn SessionResolver> = Arc::new(SessionCache::new(
            cache,
            auth_client,
            config.session_cache_ttl_seconds,
            lookup_timeout,
        ));

        let usage_meter = Arc::new(UsageMeter::new(
            store.clone(),
            tiers,
            ChatLimits::from_config(&config),
        ));

        let click_recorder = Arc::new(ClickRecorder::new(
            store.clone(),
            ClickRecorderConfig::from_config(&config),
        ));

        Self {
            config,
            start_time: Instant::now(),
            store,
            sessions,
            usage_meter,
            click_recorder,
        }
    }
}
