//! Click payload validation
//!
//! Everything is checked here so that nothing malformed reaches the
//! recorder queue.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    store::ClickEvent,
};

const MAX_SLUG_LEN: usize = 64;
const MAX_SESSION_ID_LEN: usize = 128;

static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap_or_else(|e| panic!("invalid slug regex: {}", e))
});

/// Raw body of `POST /api/affiliate/click`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickPayload {
    #[serde(default)]
    pub retailer_slug: Option<String>,
    /// Integer or decimal string; checked in [`ClickPayload::validate`]
    #[serde(default)]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// A click that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClick {
    pub retailer_slug: String,
    pub product_id: u64,
    pub session_id: Option<String>,
}

impl ValidatedClick {
    /// Stamp the click with the (optional) signed-in user
    pub fn into_event(self, user_id: Option<String>) -> ClickEvent {
        ClickEvent::new(self.retailer_slug, self.product_id, user_id, self.session_id)
    }
}

impl ClickPayload {
    pub fn validate(self) -> AppResult<ValidatedClick> {
        let retailer_slug = self
            .retailer_slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("retailerSlug is required".to_string()))?;

        if retailer_slug.len() > MAX_SLUG_LEN || !SLUG_PATTERN.is_match(&retailer_slug) {
            return Err(AppError::Validation(format!(
                "retailerSlug must be a lowercase slug of at most {} characters",
                MAX_SLUG_LEN
            )));
        }

        let product_id = match self.product_id {
            None | Some(Value::Null) => {
                return Err(AppError::Validation("productId is required".to_string()))
            }
            Some(value) => parse_product_id(&value).ok_or_else(|| {
                AppError::Validation("productId must be a positive integer".to_string())
            })?,
        };

        let session_id = self.session_id.filter(|s| !s.is_empty());
        if session_id
            .as_ref()
            .is_some_and(|s| s.len() > MAX_SESSION_ID_LEN)
        {
            return Err(AppError::Validation(format!(
                "sessionId must be at most {} characters",
                MAX_SESSION_ID_LEN
            )));
        }

        Ok(ValidatedClick {
            retailer_slug,
            product_id,
            session_id,
        })
    }
}

fn parse_product_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}
