//! Usage meter implementation
//!
//! Counts chat sessions per user per calendar month and compares them to
//! the quota of the user's subscription tier.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    billing::{SubscriptionTier, TierResolver},
    error::{AppError, AppResult},
    period::BillingPeriod,
    store::{MeterStore, UsageRecord},
    usage::limits::ChatLimits,
};

/// Usage summary for one caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResult {
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub tier: SubscriptionTier,
    pub period_end: DateTime<Utc>,
}

impl UsageResult {
    pub fn new(used: u64, limit: u64, tier: SubscriptionTier, period_end: DateTime<Utc>) -> Self {
        Self {
            used,
            limit,
            remaining: limit.saturating_sub(used),
            tier,
            period_end,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Outcome of a chat-session request that was let through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionGrant {
    /// Whether the session was counted against a quota
    pub metered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageResult>,
}

/// Chat usage meter
///
/// All state lives in the injected [`MeterStore`]; the meter itself is
/// stateless and shared across requests.
pub struct UsageMeter {
    store: Arc<dyn MeterStore>,
    tiers: Arc<dyn TierResolver>,
    limits: ChatLimits,
}

impl UsageMeter {
    pub fn new(store: Arc<dyn MeterStore>, tiers: Arc<dyn TierResolver>, limits: ChatLimits) -> Self {
        Self {
            store,
            tiers,
            limits,
        }
    }

    pub fn limits(&self) -> &ChatLimits {
        &self.limits
    }

    /// Current-month usage for an optional user
    pub async fn get_chat_usage(&self, user_id: Option<&str>) -> AppResult<UsageResult> {
        self.get_chat_usage_at(user_id, Utc::now()).await
    }

    /// Usage for the billing period containing `now`
    #[instrument(skip(self), fields(user_id = ?user_id))]
    pub async fn get_chat_usage_at(
        &self,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<UsageResult> {
        let period = current_period(now)?;

        let Some(user_id) = user_id else {
            return Ok(UsageResult::new(
                0,
                self.limits.anonymous,
                SubscriptionTier::Free,
                period.end,
            ));
        };

        let lookup = self.tiers.resolve_tier(user_id).await;
        if lookup.is_unknown() {
            warn!(user_id = %user_id, "Tier unknown, applying free tier limit");
            metrics::record_tier_fallback();
        }
        let tier = lookup.tier_or_free();

        let record = match self.store.get_or_create_usage_record(user_id, &period).await {
            Ok(record) => record,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to read chat usage");
                metrics::record_usage_lookup("error");
                return Err(AppError::UsageUnavailable(e.to_string()));
            }
        };
        metrics::record_usage_lookup("ok");

        let usage = UsageResult::new(record.count, self.limits.for_tier(tier), tier, period.end);
        debug!(
            used = usage.used,
            limit = usage.limit,
            tier = %usage.tier,
            "Computed chat usage"
        );
        Ok(usage)
    }

    /// Count one consumed chat session for the current month
    pub async fn increment_chat_usage(&self, user_id: &str) -> AppResult<UsageRecord> {
        self.increment_chat_usage_at(user_id, Utc::now()).await
    }

    /// Count one consumed chat session in the period containing `now`
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn increment_chat_usage_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UsageRecord> {
        let period = current_period(now)?;

        let count = self
            .store
            .atomic_increment(user_id, &period)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to increment chat usage");
                AppError::UsageUnavailable(e.to_string())
            })?;

        debug!(count = count, period = %period.key(), "Incremented chat usage");
        Ok(UsageRecord::new(user_id, &period, count))
    }

    /// Admit one chat session, counting it when the caller is known
    ///
    /// Rejects with [`AppError::QuotaExceeded`] only when the usage is known
    /// and exhausted. Anonymous callers and store failures are let through
    /// unmetered. Admission is the store's conditional increment, so
    /// concurrent sessions for one user never push the count past the limit.
    pub async fn consume_chat_session(&self, user_id: Option<&str>) -> AppResult<ChatSessionGrant> {
        self.consume_chat_session_at(user_id, Utc::now()).await
    }

    pub async fn consume_chat_session_at(
        &self,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<ChatSessionGrant> {
        let Some(user_id) = user_id else {
            metrics::record_chat_session("unmetered");
            let usage = self.get_chat_usage_at(None, now).await?;
            return Ok(ChatSessionGrant {
                metered: false,
                usage: Some(usage),
            });
        };

        let usage = match self.get_chat_usage_at(Some(user_id), now).await {
            Ok(usage) => usage,
            Err(AppError::UsageUnavailable(reason)) => {
                warn!(user_id = %user_id, reason = %reason, "Usage unavailable, admitting chat session unmetered");
                metrics::record_chat_session("unmetered");
                return Ok(ChatSessionGrant {
                    metered: false,
                    usage: None,
                });
            }
            Err(e) => return Err(e),
        };

        if usage.is_exhausted() {
            return Err(self.quota_exceeded(user_id, &usage, usage.used));
        }

        let period = current_period(now)?;
        match self.store.try_increment(user_id, &period, usage.limit).await {
            Ok(Some(count)) => {
                metrics::record_chat_session("metered");
                Ok(ChatSessionGrant {
                    metered: true,
                    usage: Some(UsageResult::new(count, usage.limit, usage.tier, period.end)),
                })
            }
            // Another session took the last slot since the read
            Ok(None) => Err(self.quota_exceeded(user_id, &usage, usage.limit.max(usage.used))),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Chat session admitted without being counted");
                metrics::record_chat_session("unmetered");
                Ok(ChatSessionGrant {
                    metered: false,
                    usage: Some(usage),
                })
            }
        }
    }

    fn quota_exceeded(&self, user_id: &str, usage: &UsageResult, used: u64) -> AppError {
        info!(
            user_id = %user_id,
            used = used,
            limit = usage.limit,
            "Chat quota exhausted"
        );
        metrics::record_chat_session("rejected");
        AppError::QuotaExceeded {
            message: format!(
                "Monthly chat limit of {} sessions reached for the {} tier",
                usage.limit, usage.tier
            ),
            limit: usage.limit,
            used,
            reset_at: usage.period_end.to_rfc3339(),
        }
    }
}

fn current_period(now: DateTime<Utc>) -> AppResult<BillingPeriod> {
    BillingPeriod::containing(now)
        .ok_or_else(|| AppError::Internal(anyhow!("no billing period for {}", now)))
}

/// Metrics for the usage meter
pub mod metrics {
    use metrics::counter;

    /// Record a usage read (`ok` or `error`)
    pub fn record_usage_lookup(result: &'static str) {
        counter!("meter_usage_lookups_total", "result" => result).increment(1);
    }

    /// Record a tier lookup that fell back to free
    pub fn record_tier_fallback() {
        counter!("meter_tier_fallbacks_total").increment(1);
    }

    /// Record a chat-session admission outcome
    pub fn record_chat_session(outcome: &'static str) {
        counter!("meter_chat_sessions_total", "outcome" => outcome).increment(1);
    }
}
