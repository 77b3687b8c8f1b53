//! Studio (admin dashboard) read endpoints
//!
//! Both require an admin session.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    middleware::session::CurrentUser,
    usage::UsageResult,
    AppState,
};

/// Click totals across retailers
#[derive(Debug, Serialize)]
pub struct ClickTotals {
    pub total: u64,
    pub retailers: BTreeMap<String, u64>,
}

/// `GET /api/studio/clicks`
pub async fn click_totals(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ClickTotals>> {
    current.require_admin()?;

    let retailers = state.store.click_counts_by_retailer().await?;
    let total = retailers.values().sum();

    Ok(Json(ClickTotals { total, retailers }))
}

/// `GET /api/studio/usage/:user_id`
pub async fn user_usage(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UsageResult>> {
    current.require_admin()?;

    if user_id.trim().is_empty() {
        return Err(AppError::Validation("user id is required".to_string()));
    }

    let usage = state.usage_meter.get_chat_usage(Some(&user_id)).await?;
    Ok(Json(usage))
}
