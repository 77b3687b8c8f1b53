//! Persistence layer
//!
//! `MeterStore` is the only way the meter and the click recorder touch
//! storage. The process bootstrap builds one instance and injects it.

pub mod models;
pub mod redis;

#[cfg(any(test, feature = "test-utils"))]
pub mod in_memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{error::AppResult, period::BillingPeriod};

pub use self::models::{ClickEvent, UsageRecord};
pub use self::redis::RedisStore;

#[cfg(any(test, feature = "test-utils"))]
pub use self::in_memory::InMemoryStore;

/// Storage operations for usage counters and click events
#[async_trait]
pub trait MeterStore: Send + Sync {
    /// Read the counter for (user, period), creating it at zero if absent
    async fn get_or_create_usage_record(
        &self,
        user_id: &str,
        period: &BillingPeriod,
    ) -> AppResult<UsageRecord>;

    /// Increment the counter for (user, period) by one and return the new count
    ///
    /// Must be a single atomic operation on the store side.
    async fn atomic_increment(&self, user_id: &str, period: &BillingPeriod) -> AppResult<u64>;

    /// Increment the counter only while it is below `limit`
    ///
    /// Returns the new count, or `None` when the counter already reached
    /// `limit`. The check and the increment are one atomic store operation.
    async fn try_increment(
        &self,
        user_id: &str,
        period: &BillingPeriod,
        limit: u64,
    ) -> AppResult<Option<u64>>;

    /// Append one click event
    async fn insert_click_event(&self, event: &ClickEvent) -> AppResult<()>;

    /// Total clicks recorded per retailer
    async fn click_counts_by_retailer(&self) -> AppResult<BTreeMap<String, u64>>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> AppResult<()>;
}
