//! In-memory store implementation for testing
//!
//! Holds counters and clicks behind a single mutex so every operation is
//! atomic, matching the guarantees of the Redis store. Failures can be
//! injected to exercise the degraded paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    period::BillingPeriod,
    store::{ClickEvent, MeterStore, UsageRecord},
};

#[derive(Default)]
struct Inner {
    usage: HashMap<(String, String), u64>,
    clicks: Vec<ClickEvent>,
}

/// In-memory [`MeterStore`] for tests
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    fail_usage: AtomicBool,
    fail_clicks: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make usage reads and increments fail until reset
    pub fn set_fail_usage(&self, fail: bool) {
        self.fail_usage.store(fail, Ordering::SeqCst);
    }

    /// Make click inserts fail until reset
    pub fn set_fail_clicks(&self, fail: bool) {
        self.fail_clicks.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every stored click, in insertion order
    pub fn clicks(&self) -> Vec<ClickEvent> {
        self.lock().clicks.clone()
    }

    /// Seed a counter directly
    pub fn set_usage(&self, user_id: &str, period: &BillingPeriod, count: u64) {
        self.lock()
            .usage
            .insert((user_id.to_string(), period.key()), count);
    }

    /// Counter value without creating it
    pub fn usage(&self, user_id: &str, period: &BillingPeriod) -> Option<u64> {
        self.lock()
            .usage
            .get(&(user_id.to_string(), period.key()))
            .copied()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(flag: &AtomicBool, what: &str) -> AppResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(AppError::Internal(anyhow!("injected {} failure", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl MeterStore for InMemoryStore {
    async fn get_or_create_usage_record(
        &self,
        user_id: &str,
        period: &BillingPeriod,
    ) -> AppResult<UsageRecord> {
        Self::check(&self.fail_usage, "usage")?;
        let mut inner = self.lock();
        let count = *inner
            .usage
            .entry((user_id.to_string(), period.key()))
            .or_insert(0);
        Ok(UsageRecord::new(user_id, period, count))
    }

    async fn atomic_increment(&self, user_id: &str, period: &BillingPeriod) -> AppResult<u64> {
        Self::check(&self.fail_usage, "usage")?;
        let mut inner = self.lock();
        let count = inner
            .usage
            .entry((user_id.to_string(), period.key()))
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn try_increment(
        &self,
        user_id: &str,
        period: &BillingPeriod,
        limit: u64,
    ) -> AppResult<Option<u64>> {
        Self::check(&self.fail_usage, "usage")?;
        let mut inner = self.lock();
        let count = inner
            .usage
            .entry((user_id.to_string(), period.key()))
            .or_insert(0);
        if *count >= limit {
            return Ok(None);
        }
        *count += 1;
        Ok(Some(*count))
    }

    async fn insert_click_event(&self, event: &ClickEvent) -> AppResult<()> {
        Self::check(&self.fail_clicks, "click")?;
        self.lock().clicks.push(event.clone());
        Ok(())
    }

    async fn click_counts_by_retailer(&self) -> AppResult<BTreeMap<String, u64>> {
        let mut counts = BTreeMap::new();
        for click in &self.lock().clicks {
            *counts.entry(click.retailer_slug.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn ping(&self) -> AppResult<()> {
        Self::check(&self.fail_usage, "ping")
    }
}
