//! Subscription tier resolution
//!
//! Tier lookups are best-effort. Callers get a [`TierLookup`] rather than a
//! `Result`, and must decide what `Unknown` means for them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::{
    billing::{client::BillingClient, models::SubscriptionTier},
    cache::{redis::keys, CacheBackend},
    error::AppResult,
};

/// Outcome of a tier lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierLookup {
    Resolved(SubscriptionTier),
    /// The billing collaborator could not answer
    Unknown,
}

impl TierLookup {
    /// Resolved tier, or `free` when unknown
    pub fn tier_or_free(self) -> SubscriptionTier {
        match self {
            TierLookup::Resolved(tier) => tier,
            TierLookup::Unknown => SubscriptionTier::Free,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TierLookup::Unknown)
    }
}

/// Source of subscription tiers
#[async_trait]
pub trait TierResolver: Send + Sync {
    async fn resolve_tier(&self, user_id: &str) -> TierLookup;
}

/// Tier resolver backed by the billing API with a TTL cache in front
pub struct SubscriptionTierCache {
    cache: CacheBackend,
    client: Arc<BillingClient>,
    ttl: u64,
    timeout: Duration,
}

impl SubscriptionTierCache {
    pub fn new(
        cache: CacheBackend,
        client: Arc<BillingClient>,
        ttl: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            client,
            ttl,
            timeout,
        }
    }

    async fn fetch(&self, user_id: &str) -> AppResult<SubscriptionTier> {
        let subscription = self.client.get_subscription(user_id).await?;
        let tier = subscription
            .map(|s| s.effective_tier())
            .unwrap_or(SubscriptionTier::Free);
        Ok(tier)
    }
}

#[async_trait]
impl TierResolver for SubscriptionTierCache {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn resolve_tier(&self, user_id: &str) -> TierLookup {
        let cache_key = keys::subscription_tier(user_id);

        match self.cache.get::<SubscriptionTier>(&cache_key).await {
            Ok(Some(tier)) => {
                debug!(tier = %tier, "Cache hit for subscription tier");
                return TierLookup::Resolved(tier);
            }
            Ok(None) => debug!("Cache miss for subscription tier, fetching from billing"),
            Err(e) => warn!(error = %e, "Tier cache read failed, fetching from billing"),
        }

        let tier = match tokio::time::timeout(self.timeout, self.fetch(user_id)).await {
            Ok(Ok(tier)) => tier,
            Ok(Err(e)) => {
                warn!(error = %e, "Subscription tier lookup failed");
                return TierLookup::Unknown;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Subscription tier lookup timed out"
                );
                return TierLookup::Unknown;
            }
        };

        if let Err(e) = self.cache.set_with_ttl(&cache_key, &tier, self.ttl).await {
            warn!(error = %e, "Failed to cache subscription tier");
        }

        TierLookup::Resolved(tier)
    }
}
