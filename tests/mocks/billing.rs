//! Mock billing API server
//!
//! Wraps wiremock around `GET /api/v1/subscriptions/{user_id}`.

use serde_json::json;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use std::time::Duration;

pub const TEST_BILLING_API_KEY: &str = "test-billing-key";

pub struct MockBillingServer {
    server: MockServer,
}

impl MockBillingServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Requests received for one user's subscription
    pub async fn subscription_requests(&self, user_id: &str) -> usize {
        let expected = format!("/api/v1/subscriptions/{}", user_id);
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == expected)
            .count()
    }

    /// Subscription with the given tier and status
    pub async fn mock_subscription(&self, user_id: &str, tier: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/subscriptions/{}", user_id)))
            .and(header(
                "Authorization",
                format!("Bearer {}", TEST_BILLING_API_KEY).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "tier": tier,
                    "status": status,
                    "currentPeriodEnd": "2030-01-01T00:00:00Z"
                }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_no_subscription(&self, user_id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/subscriptions/{}", user_id)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&self.server)
            .await;
    }

    /// Every subscription lookup fails with the given status
    pub async fn mock_outage(&self, status: u16) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Every subscription lookup answers after `delay`
    pub async fn mock_slow(&self, delay: Duration) {
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "success": true,
                        "data": { "tier": "premium", "status": "active" }
                    }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }
}
