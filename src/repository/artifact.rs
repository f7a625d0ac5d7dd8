//! Diesel-based artifact repository.
//!
//! Every lookup is scoped by kind, so an image id never resolves a dataset.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::{ArtifactRecord, NewArtifact};
use super::parse_datetime;
use super::pool::{DbError, SqlitePool};
use crate::models::{ArtifactKind, StoredArtifact};
use crate::schema::artifacts;

impl From<ArtifactRecord> for StoredArtifact {
    fn from(record: ArtifactRecord) -> Self {
        StoredArtifact {
            id: record.id,
            kind: ArtifactKind::from_str(&record.kind).unwrap_or(ArtifactKind::Dataset),
            name: record.name,
            file_path: record.file_path,
            content_hash: record.content_hash,
            content_type: record.content_type,
            file_size: record.file_size.max(0) as u64,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Fields describing a payload that has already been written to the store.
#[derive(Debug, Clone)]
pub struct ArtifactInput<'a> {
    pub kind: ArtifactKind,
    pub name: &'a str,
    pub file_path: &'a str,
    pub content_hash: &'a str,
    pub content_type: &'a str,
    pub file_size: u64,
}

#[derive(Clone)]
pub struct DieselArtifactRepository {
    pool: SqlitePool,
}

impl DieselArtifactRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new artifact row and return it with its assigned id.
    pub async fn insert(&self, input: &ArtifactInput<'_>) -> Result<StoredArtifact, DbError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let id: i64 = diesel::insert_into(artifacts::table)
            .values(&NewArtifact {
                kind: input.kind.as_str(),
                name: input.name,
                file_path: input.file_path,
                content_hash: input.content_hash,
                content_type: input.content_type,
                file_size: input.file_size as i64,
                created_at: &now,
                updated_at: &now,
            })
            .returning(artifacts::id)
            .get_result(&mut conn)
            .await?;

        artifacts::table
            .find(id)
            .first::<ArtifactRecord>(&mut conn)
            .await
            .map(StoredArtifact::from)
    }

    /// Get an artifact of the given kind by ID.
    pub async fn get(
        &self,
        kind: ArtifactKind,
        id: i64,
    ) -> Result<Option<StoredArtifact>, DbError> {
        let mut conn = self.pool.get().await?;

        artifacts::table
            .find(id)
            .filter(artifacts::kind.eq(kind.as_str()))
            .first::<ArtifactRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(StoredArtifact::from))
    }

    /// List all artifacts of a kind, oldest first.
    pub async fn list(&self, kind: ArtifactKind) -> Result<Vec<StoredArtifact>, DbError> {
        let mut conn = self.pool.get().await?;

        artifacts::table
            .filter(artifacts::kind.eq(kind.as_str()))
            .order(artifacts::id.asc())
            .load::<ArtifactRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(StoredArtifact::from).collect())
    }

    /// Rename an artifact. Returns the updated row, or None if it does not exist.
    pub async fn update_name(
        &self,
        kind: ArtifactKind,
        id: i64,
        name: &str,
    ) -> Result<Option<StoredArtifact>, DbError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let rows = diesel::update(
            artifacts::table
                .find(id)
                .filter(artifacts::kind.eq(kind.as_str())),
        )
        .set((artifacts::name.eq(name), artifacts::updated_at.eq(&now)))
        .execute(&mut conn)
        .await?;

        if rows == 0 {
            return Ok(None);
        }

        artifacts::table
            .find(id)
            .first::<ArtifactRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(StoredArtifact::from))
    }

    /// Delete an artifact row. Returns true if a row was removed.
    pub async fn delete(&self, kind: ArtifactKind, id: i64) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(
            artifacts::table
                .find(id)
                .filter(artifacts::kind.eq(kind.as_str())),
        )
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    /// Count rows still referencing a stored file.
    pub async fn count_by_path(&self, file_path: &str) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        artifacts::table
            .filter(artifacts::file_path.eq(file_path))
            .select(count_star())
            .first(&mut conn)
            .await
    }
}
