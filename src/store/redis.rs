//! Redis-backed store
//!
//! Usage counters are plain integer keys, one per user per month, and are
//! never expired so past months remain as a ledger. Clicks are appended to
//! a list with a per-retailer tally kept next to it.

use std::collections::BTreeMap;

use anyhow::anyhow;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::AsyncCommands;
use tracing::{debug, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    period::BillingPeriod,
    store::{ClickEvent, MeterStore, UsageRecord},
};

/// Store key layout
pub mod keys {
    use crate::period::BillingPeriod;

    /// Click event list
    pub const CLICKS: &str = "meter:clicks";

    /// Per-retailer click totals
    pub const CLICKS_BY_RETAILER: &str = "meter:clicks:by_retailer";

    /// Chat usage counter for one user and period
    pub fn usage(user_id: &str, period: &BillingPeriod) -> String {
        format!("meter:usage:{}:{}", user_id, period.key())
    }
}

/// Redis implementation of [`MeterStore`]
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Create a new Redis store
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }
}

/// INCR the counter unless it already reached the limit in ARGV[1]
static TRY_INCREMENT: Lazy<redis::Script> = Lazy::new(|| {
    redis::Script::new(
        r#"
        local current = tonumber(redis.call('GET', KEYS[1]) or '0')
        if current >= tonumber(ARGV[1]) then
            return false
        end
        return redis.call('INCR', KEYS[1])
        "#,
    )
});

/// Counters are only ever incremented, so a negative value means the key
/// was written by something else.
fn to_count(key: &str, value: i64) -> AppResult<u64> {
    u64::try_from(value).map_err(|_| {
        warn!(key = %key, value = value, "Usage counter is negative");
        AppError::Internal(anyhow!("usage counter {} is negative ({})", key, value))
    })
}

#[async_trait]
impl MeterStore for RedisStore {
    #[instrument(skip(self, period), fields(period = %period.key()))]
    async fn get_or_create_usage_record(
        &self,
        user_id: &str,
        period: &BillingPeriod,
    ) -> AppResult<UsageRecord> {
        let key = keys::usage(user_id, period);
        let mut conn = self.conn.clone();

        // SET NX initialises the counter without clobbering a concurrent INCR
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&key)
            .arg(0)
            .arg("NX")
            .ignore()
            .get(&key)
            .query_async(&mut conn)
            .await?;

        debug!(count = count, "Loaded usage counter");
        Ok(UsageRecord::new(user_id, period, to_count(&key, count)?))
    }

    #[instrument(skip(self, period), fields(period = %period.key()))]
    async fn atomic_increment(&self, user_id: &str, period: &BillingPeriod) -> AppResult<u64> {
        let key = keys::usage(user_id, period);
        let mut conn = self.conn.clone();
        let count: i64 = conn.incr(&key, 1i64).await?;
        to_count(&key, count)
    }

    #[instrument(skip(self, period), fields(period = %period.key()))]
    async fn try_increment(
        &self,
        user_id: &str,
        period: &BillingPeriod,
        limit: u64,
    ) -> AppResult<Option<u64>> {
        let key = keys::usage(user_id, period);
        let mut conn = self.conn.clone();

        let count: Option<i64> = TRY_INCREMENT
            .key(&key)
            .arg(limit)
            .invoke_async(&mut conn)
            .await?;

        count.map(|count| to_count(&key, count)).transpose()
    }

    #[instrument(skip(self, event), fields(retailer = %event.retailer_slug, product_id = event.product_id))]
    async fn insert_click_event(&self, event: &ClickEvent) -> AppResult<()> {
        let json = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();

        let _: () = redis::pipe()
            .atomic()
            .rpush(keys::CLICKS, json)
            .ignore()
            .hincr(keys::CLICKS_BY_RETAILER, &event.retailer_slug, 1i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn click_counts_by_retailer(&self) -> AppResult<BTreeMap<String, u64>> {
        let mut conn = self.conn.clone();
        let counts: BTreeMap<String, u64> = conn.hgetall(keys::CLICKS_BY_RETAILER).await?;
        Ok(counts)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }
}
