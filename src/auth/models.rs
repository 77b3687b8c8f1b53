//! Auth API data models

use serde::{Deserialize, Serialize};

/// Role attached to a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// The user behind a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Envelope returned by `GET /api/v1/session`
#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    pub success: bool,
    pub data: SessionUser,
}
