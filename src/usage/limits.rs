//! Monthly chat-session quotas

use serde::{Deserialize, Serialize};

use crate::{billing::SubscriptionTier, config::Config};

/// Static tier → quota table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLimits {
    pub anonymous: u64,
    pub free: u64,
    pub premium: u64,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            anonymous: 3,
            free: 20,
            premium: 1000,
        }
    }
}

impl ChatLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            anonymous: config.anonymous_chat_limit,
            free: config.free_chat_limit,
            premium: config.premium_chat_limit,
        }
    }

    /// Quota for a signed-in user of `tier`
    pub fn for_tier(&self, tier: SubscriptionTier) -> u64 {
        match tier {
            SubscriptionTier::Free => self.free,
            SubscriptionTier::Premium => self.premium,
        }
    }
}
