//! Affiliate click endpoint
//!
//! `POST /api/affiliate/click` validates the payload and hands the click to
//! the recorder without waiting for it to be written.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    clicks::ClickPayload,
    error::{AppError, AppResult},
    middleware::session::CurrentUser,
    AppState,
};

/// Acknowledgement returned for every valid click
#[derive(Debug, Serialize)]
pub struct ClickAck {
    pub success: bool,
}

/// Record an affiliate click-through
///
/// Only validation errors reach the caller; the write outcome never does.
pub async fn track_click(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<ClickPayload>, JsonRejection>,
) -> AppResult<Json<ClickAck>> {
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let click = payload.validate()?;

    debug!(
        retailer = %click.retailer_slug,
        product_id = click.product_id,
        "Queueing affiliate click"
    );

    let event = click.into_event(current.user_id().map(str::to_owned));
    state.click_recorder.track(event);

    Ok(Json(ClickAck { success: true }))
}
