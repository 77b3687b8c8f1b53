//! Session middleware
//!
//! Resolves the caller's session and stores it in request extensions.
//! Never rejects a request: anything that cannot be resolved is anonymous.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument};

use crate::{
    auth::{SessionLookup, SessionUser},
    error::AppError,
    AppState,
};

/// The resolved caller, `None` when anonymous
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<SessionUser>);

impl CurrentUser {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|user| user.id.as_str())
    }

    /// The user, or `Unauthorized` when anonymous
    pub fn require(&self) -> Result<&SessionUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }

    /// The user if they are an admin
    pub fn require_admin(&self) -> Result<&SessionUser, AppError> {
        let user = self.require()?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Find a cookie value by name in the Cookie headers
pub fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Session token from the bearer header, else from the session cookie
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token)
        .or_else(|| extract_cookie(headers, cookie_name))
}

/// Session middleware
///
/// This middleware:
/// 1. Takes the session token from the Authorization header or cookie
/// 2. Resolves it through the session resolver (cached, fail-open)
/// 3. Adds `CurrentUser` to request extensions
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers(), &state.config.session_cookie_name)
        .map(str::to_owned);

    let user = match token {
        Some(token) => match state.sessions.resolve_session(&token).await {
            SessionLookup::Authenticated(user) => {
                debug!(user_id = %user.id, "Session resolved");
                Some(user)
            }
            SessionLookup::Anonymous => None,
        },
        None => None,
    };

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}
