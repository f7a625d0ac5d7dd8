//! Database context providing repository access.

use std::path::Path;

use super::artifact::DieselArtifactRepository;
use super::pool::{DbError, SqlitePool};
use super::user::DieselUserRepository;

/// Entry point for database operations.
///
/// Create one per command or server, then hand out repositories from it.
#[derive(Clone)]
pub struct DbContext {
    pool: SqlitePool,
}

impl DbContext {
    /// Create a context from a SQLite file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: SqlitePool::from_path(db_path),
        }
    }

    /// Create a context from a database URL (`sqlite:path` or a bare path).
    pub fn from_url(database_url: &str) -> Self {
        Self {
            pool: SqlitePool::new(database_url),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn artifacts(&self) -> DieselArtifactRepository {
        DieselArtifactRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> DieselUserRepository {
        DieselUserRepository::new(self.pool.clone())
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), DbError> {
        super::migrations::run_migrations(self.pool.database_url()).await
    }
}
