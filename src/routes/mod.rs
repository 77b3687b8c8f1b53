//! HTTP routes for the meter service

pub mod clicks;
pub mod health;
pub mod metrics;
pub mod studio;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{middleware::session::session_middleware, AppState};

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Session resolution never rejects; handlers decide what anonymous means
    let api_routes = Router::new()
        .route("/api/chat/usage", get(usage::get_usage))
        .route("/api/chat/sessions", post(usage::start_chat_session))
        .route("/api/affiliate/click", post(clicks::track_click))
        .route("/api/studio/clicks", get(studio::click_totals))
        .route("/api/studio/usage/:user_id", get(studio::user_usage))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_seconds,
        )))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
