//! Chat usage endpoints
//!
//! - `GET /api/chat/usage` - current-month usage summary for the caller
//! - `POST /api/chat/sessions` - admit (and count) one chat session

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use tracing::instrument;

use crate::{
    error::AppResult,
    middleware::session::CurrentUser,
    usage::{ChatSessionGrant, UsageResult},
    AppState,
};

/// Usage summary for the current caller
///
/// Anonymous callers get the anonymous quota. A store outage surfaces as
/// 503 `USAGE_UNAVAILABLE`, which clients must treat as "unknown" rather
/// than "exhausted".
#[instrument(skip_all, fields(user_id = ?current.user_id()))]
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<UsageResult>> {
    let usage = state.usage_meter.get_chat_usage(current.user_id()).await?;
    Ok(Json(usage))
}

/// Admit one chat session
///
/// Returns 429 `QUOTA_EXCEEDED` when the caller's monthly quota is used up.
#[instrument(skip_all, fields(user_id = ?current.user_id()))]
pub async fn start_chat_session(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ChatSessionGrant>> {
    let grant = state
        .usage_meter
        .consume_chat_session(current.user_id())
        .await?;
    Ok(Json(grant))
}
