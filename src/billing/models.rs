//! Billing API data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription level controlling chat quotas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment state of a subscription as reported by the billing API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Whether the subscription currently grants its tier
    pub fn is_entitled(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

/// Subscription record for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionData {
    /// Tier the user is entitled to right now
    pub fn effective_tier(&self) -> SubscriptionTier {
        if self.status.is_entitled() {
            self.tier
        } else {
            SubscriptionTier::Free
        }
    }
}

/// Envelope returned by `GET /api/v1/subscriptions/{user_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionResponse {
    pub success: bool,
    pub data: SubscriptionData,
}
