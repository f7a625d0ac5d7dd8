//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite.

pub mod artifact;
pub mod context;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod user;
pub mod util;

pub use artifact::{ArtifactInput, DieselArtifactRepository};
pub use context::DbContext;
pub use pool::{DbError, SqlitePool};
pub use user::DieselUserRepository;

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
