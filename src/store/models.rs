//! Persisted records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::period::BillingPeriod;

/// Chat sessions consumed by one user within one billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub user_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub count: u64,
}

impl UsageRecord {
    pub fn new(user_id: &str, period: &BillingPeriod, count: u64) -> Self {
        Self {
            user_id: user_id.to_string(),
            period_start: period.start,
            period_end: period.end,
            count,
        }
    }
}

/// An affiliate click-through, append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub id: Uuid,
    pub retailer_slug: String,
    pub product_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClickEvent {
    /// Create a click stamped with a fresh id and the current time
    pub fn new(
        retailer_slug: String,
        product_id: u64,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            retailer_slug,
            product_id,
            user_id,
            session_id,
            created_at: Utc::now(),
        }
    }
}
