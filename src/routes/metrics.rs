//! Prometheus metrics endpoint

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;

static PROMETHEUS_HANDLE: Lazy<PrometheusHandle> = Lazy::new(|| {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
});

/// Initialize metrics (call once at startup)
pub fn init_metrics() {
    let _ = &*PROMETHEUS_HANDLE;
    describe_metrics();
}

fn describe_metrics() {
    metrics::describe_counter!(
        "meter_usage_lookups_total",
        "Chat usage lookups by result (ok, error)"
    );
    metrics::describe_counter!(
        "meter_tier_fallbacks_total",
        "Usage lookups that fell back to the free tier because billing was unreachable"
    );
    metrics::describe_counter!(
        "meter_chat_sessions_total",
        "Chat session admissions by outcome"
    );
    metrics::describe_counter!(
        "meter_clicks_total",
        "Affiliate clicks by outcome (accepted, dropped, persisted, failed)"
    );
}

/// Returns metrics in Prometheus text format for scraping.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE.render()
}
