//! Affiliate click tracking module
//!
//! Validates click payloads and records them in the background.

pub mod recorder;
pub mod validation;

pub use recorder::{ClickRecorder, ClickRecorderConfig};
pub use validation::{ClickPayload, ValidatedClick};
