//! Configuration management for the meter service
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Redis connection URL (usage counters, click events, caches)
    pub redis_url: String,

    /// Billing API base URL
    pub billing_api_url: String,
    /// Service key for the billing API
    pub billing_api_key: String,

    /// Auth API base URL used to resolve session tokens
    pub auth_api_url: String,
    /// Cookie consulted when no bearer token is present
    pub session_cookie_name: String,

    /// Monthly chat sessions for anonymous callers
    pub anonymous_chat_limit: u64,
    /// Monthly chat sessions for the free tier
    pub free_chat_limit: u64,
    /// Monthly chat sessions for the premium tier
    pub premium_chat_limit: u64,

    /// Cache TTL for resolved subscription tiers (in seconds)
    pub tier_cache_ttl_seconds: u64,
    /// Cache TTL for resolved sessions (in seconds)
    pub session_cache_ttl_seconds: u64,
    /// Timeout for billing/auth lookups (in milliseconds)
    pub collaborator_timeout_ms: u64,
    /// Request-level timeout applied to every route (in seconds)
    pub request_timeout_seconds: u64,

    /// Click recorder queue capacity
    pub click_channel_buffer: usize,
    /// Maximum click writes per second
    pub click_write_rate_per_second: u32,
    /// Write attempts per click before it is given up
    pub click_max_attempts: u32,
}

/// Read an env var, falling back to a default, and parse it
fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("Invalid {}", name))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("METER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("METER_PORT", "8080")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            billing_api_url: env::var("BILLING_API_URL")
                .context("BILLING_API_URL must be set")?,
            billing_api_key: env::var("BILLING_API_KEY")
                .context("BILLING_API_KEY must be set")?,

            auth_api_url: env::var("AUTH_API_URL").context("AUTH_API_URL must be set")?,
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "session_token".to_string()),

            anonymous_chat_limit: parse_var("ANONYMOUS_CHAT_LIMIT", "3")?,
            free_chat_limit: parse_var("FREE_CHAT_LIMIT", "20")?,
            premium_chat_limit: parse_var("PREMIUM_CHAT_LIMIT", "1000")?,

            tier_cache_ttl_seconds: parse_var("TIER_CACHE_TTL_SECONDS", "300")?,
            session_cache_ttl_seconds: parse_var("SESSION_CACHE_TTL_SECONDS", "60")?,
            collaborator_timeout_ms: parse_var("COLLABORATOR_TIMEOUT_MS", "2000")?,
            request_timeout_seconds: parse_var("REQUEST_TIMEOUT_SECONDS", "10")?,

            click_channel_buffer: parse_var("CLICK_CHANNEL_BUFFER", "10000")?,
            click_write_rate_per_second: parse_var("CLICK_WRITE_RATE_PER_SECOND", "200")?,
            click_max_attempts: parse_var("CLICK_MAX_ATTEMPTS", "3")?,
        })
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Defaults with the collaborators at the given URLs and short timeouts
    pub fn for_testing(billing_api_url: &str, auth_api_url: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            billing_api_url: billing_api_url.to_string(),
            billing_api_key: "test-billing-key".to_string(),
            auth_api_url: auth_api_url.to_string(),
            session_cookie_name: "session_token".to_string(),
            anonymous_chat_limit: 3,
            free_chat_limit: 20,
            premium_chat_limit: 1000,
            tier_cache_ttl_seconds: 60,
            session_cache_ttl_seconds: 60,
            collaborator_timeout_ms: 500,
            request_timeout_seconds: 5,
            click_channel_buffer: 1000,
            click_write_rate_per_second: 1000,
            click_max_attempts: 3,
        }
    }
}
