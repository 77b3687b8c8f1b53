//! Auth API client
//!
//! Exchanges a session token for the user it belongs to.

use reqwest::{header::AUTHORIZATION, StatusCode};
use tracing::{debug, error, instrument};

use crate::{
    auth::models::{SessionResponse, SessionUser},
    error::{AppError, AppResult},
};

/// Auth API client
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    /// Create a new auth client
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up the session for a token
    ///
    /// Returns `None` when the auth API rejects the token.
    #[instrument(skip_all)]
    pub async fn get_session(&self, token: &str) -> AppResult<Option<SessionUser>> {
        let url = format!("{}/api/v1/session", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Auth session response status");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Auth session request failed");
            return Err(AppError::UpstreamError(format!(
                "Auth API error {}: {}",
                status, text
            )));
        }

        let result: SessionResponse = response.json().await?;
        if !result.success {
            return Ok(None);
        }

        Ok(Some(result.data))
    }
}
