//! Usage metering module
//!
//! Monthly chat-session counting against tier quotas.

pub mod limits;
pub mod meter;

pub use limits::ChatLimits;
pub use meter::{ChatSessionGrant, UsageMeter, UsageResult};
