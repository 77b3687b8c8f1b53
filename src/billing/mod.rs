//! Billing integration module
//!
//! Resolves a user's subscription tier from the billing API.

pub mod client;
pub mod models;
pub mod resolver;

pub use client::BillingClient;
pub use models::{SubscriptionData, SubscriptionStatus, SubscriptionTier};
pub use resolver::{SubscriptionTierCache, TierLookup, TierResolver};
