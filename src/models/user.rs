//! User account model.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Usernames are matched case-insensitively and stored lower-case.
    pub fn normalize_username(username: &str) -> String {
        username.trim().to_lowercase()
    }

    /// Public part of the account returned to clients.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({ "id": self.id, "username": self.username })
    }
}
