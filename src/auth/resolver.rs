//! Session resolution
//!
//! Any failure to resolve a session degrades to anonymous.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::{
    auth::{client::AuthClient, models::SessionUser},
    cache::{redis::keys, CacheBackend},
};

/// Outcome of a session lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Authenticated(SessionUser),
    Anonymous,
}

impl SessionLookup {
    pub fn into_user(self) -> Option<SessionUser> {
        match self {
            SessionLookup::Authenticated(user) => Some(user),
            SessionLookup::Anonymous => None,
        }
    }
}

/// Source of session identities
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve_session(&self, token: &str) -> SessionLookup;
}

/// Hash a session token for use as a cache key
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Session resolver backed by the auth API with a TTL cache in front
pub struct SessionCache {
    cache: CacheBackend,
    client: Arc<AuthClient>,
    ttl: u64,
    timeout: Duration,
}

impl SessionCache {
    pub fn new(cache: CacheBackend, client: Arc<AuthClient>, ttl: u64, timeout: Duration) -> Self {
        Self {
            cache,
            client,
            ttl,
            timeout,
        }
    }
}

#[async_trait]
impl SessionResolver for SessionCache {
    #[instrument(skip_all)]
    async fn resolve_session(&self, token: &str) -> SessionLookup {
        let token_hash = hash_token(token);
        let cache_key = keys::session(&token_hash);

        match self.cache.get::<SessionUser>(&cache_key).await {
            Ok(Some(user)) => {
                debug!(user_id = %user.id, "Cache hit for session");
                return SessionLookup::Authenticated(user);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Session cache read failed"),
        }

        let user = match tokio::time::timeout(self.timeout, self.client.get_session(token)).await {
            Ok(Ok(Some(user))) => user,
            Ok(Ok(None)) => {
                debug!("Session token rejected, treating as anonymous");
                return SessionLookup::Anonymous;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Session lookup failed, treating as anonymous");
                return SessionLookup::Anonymous;
            }
            Err(_) => {
                warn!("Session lookup timed out, treating as anonymous");
                return SessionLookup::Anonymous;
            }
        };

        if let Err(e) = self.cache.set_with_ttl(&cache_key, &user, self.ttl).await {
            warn!(error = %e, "Failed to cache session");
        }

        SessionLookup::Authenticated(user)
    }
}
