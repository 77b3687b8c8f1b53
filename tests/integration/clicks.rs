//! Affiliate click endpoint tests
//!
//! POST /api/affiliate/click

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{constants::*, with_token, TestApp};

#[tokio::test]
async fn test_click_is_acknowledged_and_persisted() {
    let app = TestApp::spawn().await;

    let response = with_token(app.server.post("/api/affiliate/click"), USER_TOKEN)
        .json(&json!({ "retailerSlug": "ikea", "productId": 42, "sessionId": "sess-1" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, json!({ "success": true }));

    assert!(app.wait_for_clicks(1).await, "click was never written");
    let clicks = app.store.clicks();
    assert_eq!(clicks[0].retailer_slug, "ikea");
    assert_eq!(clicks[0].product_id, 42);
    assert_eq!(clicks[0].user_id.as_deref(), Some(USER_ID));
    assert_eq!(clicks[0].session_id.as_deref(), Some("sess-1"));
}

#[tokio::test]
async fn test_anonymous_click_has_no_user() {
    let app = TestApp::spawn().await;

    app.server
        .post("/api/affiliate/click")
        .json(&json!({ "retailerSlug": "wayfair", "productId": "17" }))
        .await
        .assert_status_ok();

    assert!(app.wait_for_clicks(1).await);
    let clicks = app.store.clicks();
    assert_eq!(clicks[0].product_id, 17);
    assert_eq!(clicks[0].user_id, None);
}

#[tokio::test]
async fn test_invalid_click_is_rejected_and_not_stored() {
    let app = TestApp::spawn().await;

    let invalid = [
        json!({ "productId": 42 }),
        json!({ "retailerSlug": "ikea" }),
        json!({ "retailerSlug": "IKEA!", "productId": 42 }),
        json!({ "retailerSlug": "ikea", "productId": -5 }),
        json!({ "retailerSlug": "ikea", "productId": "abc" }),
    ];

    for payload in invalid {
        let response = app.server.post("/api/affiliate/click").json(&payload).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "payload {}", payload);
    }

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(app.store.clicks().is_empty());
    assert_eq!(app.state.click_recorder.queued(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let response = app.server.post("/api/affiliate/click").text("{not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_store_failure_never_reaches_the_caller() {
    let app = TestApp::spawn().await;
    app.store.set_fail_clicks(true);

    let response = app
        .server
        .post("/api/affiliate/click")
        .json(&json!({ "retailerSlug": "ikea", "productId": 1 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_repeated_clicks_are_all_recorded() {
    let app = TestApp::spawn().await;

    for _ in 0..5 {
        app.server
            .post("/api/affiliate/click")
            .json(&json!({ "retailerSlug": "ikea", "productId": 42 }))
            .await
            .assert_status_ok();
    }

    assert!(app.wait_for_clicks(5).await);
    assert_eq!(app.store.clicks().len(), 5);
}
