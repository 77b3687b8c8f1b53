//! Middleware module
//!
//! Contains Tower middleware for session resolution.

pub mod session;
