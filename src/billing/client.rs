//! Billing API client
//!
//! HTTP client for looking up a user's subscription.

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    StatusCode,
};
use tracing::{debug, error, instrument};

use crate::{
    billing::models::{SubscriptionData, SubscriptionResponse},
    error::{AppError, AppResult},
};

/// Billing API client
pub struct BillingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BillingClient {
    /// Create a new billing client
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Get the subscription for a user
    ///
    /// Returns `None` when the billing API has no subscription for the user.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_subscription(&self, user_id: &str) -> AppResult<Option<SubscriptionData>> {
        let url = format!("{}/api/v1/subscriptions/{}", self.base_url, user_id);

        debug!(url = %url, "Fetching subscription from billing API");

        let response = self
            .client
            .get(&url)
            .headers(self.api_key_headers()?)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Billing response status");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Billing subscription request failed");
            return Err(AppError::UpstreamError(format!(
                "Billing API error {}: {}",
                status, text
            )));
        }

        let body = response.text().await?;

        let result: SubscriptionResponse = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, body = %body, "Failed to parse billing response");
                return Err(AppError::UpstreamError(format!(
                    "Failed to parse billing response: {}",
                    e
                )));
            }
        };

        if !result.success {
            return Err(AppError::UpstreamError(
                "Billing API reported failure".to_string(),
            ));
        }

        Ok(Some(result.data))
    }

    fn api_key_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| AppError::Internal(e.into()))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}
