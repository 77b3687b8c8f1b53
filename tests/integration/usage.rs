//! Chat usage endpoint tests
//!
//! - GET /api/chat/usage
//! - POST /api/chat/sessions

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use homegoods_meter::BillingPeriod;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::{constants::*, with_cookie, with_token, TestApp};

fn this_month() -> BillingPeriod {
    BillingPeriod::containing(Utc::now()).unwrap()
}

#[tokio::test]
async fn test_anonymous_usage_uses_anonymous_quota() {
    let app = TestApp::spawn().await;

    let response = app.server.get("/api/chat/usage").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["used"], 0);
    assert_eq!(body["limit"], 3);
    assert_eq!(body["remaining"], 3);
    assert_eq!(body["tier"], "free");
    let period_end = DateTime::parse_from_rfc3339(body["periodEnd"].as_str().unwrap()).unwrap();
    assert_eq!(period_end.with_timezone(&Utc), this_month().end);
}

#[tokio::test]
async fn test_new_free_user_starts_at_zero() {
    let app = TestApp::spawn().await;
    app.billing.mock_no_subscription(USER_ID).await;

    let response = with_token(app.server.get("/api/chat/usage"), USER_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["used"], 0);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["remaining"], 20);
    assert_eq!(body["tier"], "free");
    assert_eq!(app.store.usage(USER_ID, &this_month()), Some(0));
}

#[tokio::test]
async fn test_premium_user_usage() {
    let app = TestApp::spawn().await;
    app.billing
        .mock_subscription(PREMIUM_USER_ID, "premium", "active")
        .await;
    app.store.set_usage(PREMIUM_USER_ID, &this_month(), 5);

    let response = with_token(app.server.get("/api/chat/usage"), PREMIUM_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["used"], 5);
    assert_eq!(body["limit"], 1000);
    assert_eq!(body["remaining"], 995);
    assert_eq!(body["tier"], "premium");
}

#[tokio::test]
async fn test_lapsed_premium_is_free() {
    let app = TestApp::spawn().await;
    app.billing
        .mock_subscription(PREMIUM_USER_ID, "premium", "past_due")
        .await;

    let response = with_token(app.server.get("/api/chat/usage"), PREMIUM_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["tier"], "free");
    assert_eq!(body["limit"], 20);
}

#[tokio::test]
async fn test_billing_outage_falls_back_to_free() {
    let app = TestApp::spawn().await;
    app.billing.mock_outage(500).await;

    let response = with_token(app.server.get("/api/chat/usage"), PREMIUM_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["tier"], "free");
    assert_eq!(body["limit"], 20);
}

#[tokio::test]
async fn test_slow_billing_falls_back_to_free() {
    let app = TestApp::spawn().await;
    app.billing.mock_slow(Duration::from_secs(2)).await;

    let response = with_token(app.server.get("/api/chat/usage"), PREMIUM_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["tier"], "free");
}

#[tokio::test]
async fn test_tier_is_cached_between_requests() {
    let app = TestApp::spawn().await;
    app.billing
        .mock_subscription(PREMIUM_USER_ID, "premium", "active")
        .await;

    for _ in 0..3 {
        with_token(app.server.get("/api/chat/usage"), PREMIUM_TOKEN)
            .await
            .assert_status_ok();
    }

    assert_eq!(app.billing.subscription_requests(PREMIUM_USER_ID).await, 1);
}

#[tokio::test]
async fn test_store_outage_is_unavailable_not_exhausted() {
    let app = TestApp::spawn().await;
    app.billing.mock_no_subscription(USER_ID).await;
    app.store.set_fail_usage(true);

    let response = with_token(app.server.get("/api/chat/usage"), USER_TOKEN).await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "USAGE_UNAVAILABLE");
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = TestApp::spawn().await;
    app.billing.mock_no_subscription(USER_ID).await;
    app.store.set_usage(USER_ID, &this_month(), 7);

    let response = with_cookie(app.server.get("/api/chat/usage"), USER_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["used"], 7);
    assert_eq!(body["limit"], 20);
}

#[tokio::test]
async fn test_unknown_token_is_anonymous() {
    let app = TestApp::spawn().await;

    let response = with_token(app.server.get("/api/chat/usage"), "not-a-session").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["limit"], 3);
    assert_eq!(body["used"], 0);
}

#[tokio::test]
async fn test_chat_session_is_counted() {
    let app = TestApp::spawn().await;
    app.billing.mock_no_subscription(USER_ID).await;

    let response = with_token(app.server.post("/api/chat/sessions"), USER_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["metered"], true);
    assert_eq!(body["usage"]["used"], 1);
    assert_eq!(body["usage"]["remaining"], 19);

    let usage: Value = with_token(app.server.get("/api/chat/usage"), USER_TOKEN)
        .await
        .json();
    assert_eq!(usage["used"], 1);
}

#[tokio::test]
async fn test_exhausted_quota_is_rejected() {
    let app = TestApp::spawn().await;
    app.billing.mock_no_subscription(USER_ID).await;
    app.store.set_usage(USER_ID, &this_month(), 20);

    let response = with_token(app.server.post("/api/chat/sessions"), USER_TOKEN).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "QUOTA_EXCEEDED");
    assert_eq!(body["error"]["details"]["limit"], 20);
    assert_eq!(body["error"]["details"]["used"], 20);
    assert!(body["error"]["details"]["resetAt"].is_string());

    // Rejected sessions are not counted
    assert_eq!(app.store.usage(USER_ID, &this_month()), Some(20));
}

#[tokio::test]
async fn test_over_quota_count_reports_zero_remaining() {
    let app = TestApp::spawn().await;
    app.billing.mock_no_subscription(USER_ID).await;
    app.store.set_usage(USER_ID, &this_month(), 25);

    let body: Value = with_token(app.server.get("/api/chat/usage"), USER_TOKEN)
        .await
        .json();
    assert_eq!(body["used"], 25);
    assert_eq!(body["remaining"], 0);
}

#[tokio::test]
async fn test_chat_session_admitted_when_store_is_down() {
    let app = TestApp::spawn().await;
    app.billing.mock_no_subscription(USER_ID).await;
    app.store.set_fail_usage(true);

    let response = with_token(app.server.post("/api/chat/sessions"), USER_TOKEN).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["metered"], false);
    assert!(body.get("usage").is_none());
}

#[tokio::test]
async fn test_anonymous_chat_session_is_unmetered() {
    let app = TestApp::spawn().await;

    let response = app.server.post("/api/chat/sessions").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["metered"], false);
    assert_eq!(body["usage"]["limit"], 3);
}
