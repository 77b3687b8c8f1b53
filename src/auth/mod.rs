//! Session resolution module
//!
//! Maps session tokens to users via the auth API.

pub mod client;
pub mod models;
pub mod resolver;

pub use client::AuthClient;
pub use models::{Role, SessionUser};
pub use resolver::{hash_token, SessionCache, SessionLookup, SessionResolver};
