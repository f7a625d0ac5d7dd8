//! Upload, lookup, rename and deletion of stored artifacts.

use crate::error::{ServiceError, ServiceResult};
use crate::models::{ArtifactKind, StoredArtifact};
use crate::repository::{ArtifactInput, DbContext};
use crate::storage::ContentStore;

/// Longest accepted artifact name.
pub const MAX_NAME_LEN: usize = 255;

/// One file received for upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content: Vec<u8>,
}

#[derive(Clone)]
pub struct ArtifactService {
    db: DbContext,
    store: ContentStore,
    max_upload_bytes: usize,
}

impl ArtifactService {
    pub fn new(db: DbContext, store: ContentStore, max_upload_bytes: usize) -> Self {
        Self {
            db,
            store,
            max_upload_bytes,
        }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    fn validate_name(name: &str) -> ServiceResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Name must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::validation(format!(
                "Name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        Ok(name.to_string())
    }

    /// Persist one payload under a new id.
    pub async fn upload(&self, kind: ArtifactKind, upload: &Upload) -> ServiceResult<StoredArtifact> {
        if upload.content.is_empty() {
            return Err(ServiceError::validation("No file was submitted or the file is empty"));
        }
        if upload.content.len() > self.max_upload_bytes {
            return Err(ServiceError::validation(format!(
                "File exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }
        let name = Self::validate_name(&upload.name)?;

        if kind == ArtifactKind::Image {
            let content = upload.content.clone();
            let decodes = tokio::task::spawn_blocking(move || image::load_from_memory(&content).is_ok())
                .await
                .map_err(|e| ServiceError::upstream("Failed to validate image", e))?;
            if !decodes {
                return Err(ServiceError::validation(
                    "Upload a valid image. The file is not an image or is corrupted",
                ));
            }
        }

        let stored = self.store.save(kind, &name, &upload.content).await?;
        let artifact = self
            .db
            .artifacts()
            .insert(&ArtifactInput {
                kind,
                name: &name,
                file_path: &stored.relative_path,
                content_hash: &stored.content_hash,
                content_type: &stored.content_type,
                file_size: stored.file_size,
            })
            .await?;

        tracing::info!(
            "Stored {} {} ({} bytes) at {}",
            kind.as_str(),
            artifact.id,
            artifact.file_size,
            artifact.file_path
        );
        Ok(artifact)
    }

    /// Store each payload independently. Failures are logged and skipped.
    pub async fn batch_upload(
        &self,
        kind: ArtifactKind,
        uploads: &[Upload],
    ) -> ServiceResult<Vec<StoredArtifact>> {
        if uploads.is_empty() {
            return Err(ServiceError::validation("No files were submitted"));
        }
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.upload(kind, upload).await {
                Ok(artifact) => stored.push(artifact),
                Err(e) => tracing::warn!("Skipping '{}' in batch upload: {}", upload.name, e),
            }
        }
        Ok(stored)
    }

    pub async fn get(&self, kind: ArtifactKind, id: i64) -> ServiceResult<StoredArtifact> {
        self.db
            .artifacts()
            .get(kind, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("{} not found", kind.label())))
    }

    /// Load the stored bytes of an artifact.
    pub async fn payload(&self, kind: ArtifactKind, id: i64) -> ServiceResult<Vec<u8>> {
        let artifact = self.get(kind, id).await?;
        Ok(self.store.read(&artifact.file_path).await?)
    }

    /// Rename an artifact; the payload is untouched.
    pub async fn update(&self, kind: ArtifactKind, id: i64, name: &str) -> ServiceResult<StoredArtifact> {
        let name = Self::validate_name(name)?;
        self.db
            .artifacts()
            .update_name(kind, id, &name)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("{} not found", kind.label())))
    }

    /// Delete the row, then the file if no other row shares it.
    pub async fn delete(&self, kind: ArtifactKind, id: i64) -> ServiceResult<()> {
        let artifact = self.get(kind, id).await?;
        let repo = self.db.artifacts();
        if !repo.delete(kind, id).await? {
            return Err(ServiceError::not_found(format!("{} not found", kind.label())));
        }
        if repo.count_by_path(&artifact.file_path).await? == 0 {
            self.store.remove(&artifact.file_path).await?;
        }
        tracing::info!("Deleted {} {}", kind.as_str(), id);
        Ok(())
    }
}
