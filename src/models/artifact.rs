//! Stored artifact models.
//!
//! Images and datasets share one representation; the kind decides where the
//! payload lives on disk and which endpoints may resolve it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What a stored payload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    Dataset,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Dataset => "dataset",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "dataset" => Some(Self::Dataset),
            _ => None,
        }
    }

    /// Subdirectory of the media root holding payloads of this kind.
    pub fn storage_dir(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Dataset => "uploads",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Dataset => "Dataset",
        }
    }
}

/// A persisted upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArtifact {
    /// Database row ID, assigned on insert and never reused.
    pub id: i64,
    pub kind: ArtifactKind,
    /// Original name supplied at upload, editable afterwards.
    pub name: String,
    /// Payload path relative to the media root, `/`-separated.
    pub file_path: String,
    /// SHA-256 of the payload.
    pub content_hash: String,
    pub content_type: String,
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredArtifact {
    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }

    /// Render the JSON representation returned by the API.
    pub fn to_json(&self, base_url: &str) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "kind": self.kind,
            "name": self.name,
            "file": format!("{}/media/{}", base_url.trim_end_matches('/'), self.file_path),
            "content_type": self.content_type,
            "file_size": self.file_size,
            "content_hash": self.content_hash,
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_and_dirs() {
        assert_eq!(ArtifactKind::from_str("image"), Some(ArtifactKind::Image));
        assert_eq!(
            ArtifactKind::from_str(ArtifactKind::Dataset.as_str()),
            Some(ArtifactKind::Dataset)
        );
        assert_eq!(ArtifactKind::from_str("video"), None);
        assert_eq!(ArtifactKind::Image.storage_dir(), "images");
        assert_eq!(ArtifactKind::Dataset.storage_dir(), "uploads");
    }

    #[test]
    fn test_compute_hash() {
        assert_eq!(
            StoredArtifact::compute_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_to_json_builds_absolute_url() {
        let now = Utc::now();
        let artifact = StoredArtifact {
            id: 7,
            kind: ArtifactKind::Image,
            name: "cat.png".into(),
            file_path: "images/ab/cat-abcdef12.png".into(),
            content_hash: "abcdef12".into(),
            content_type: "image/png".into(),
            file_size: 42,
            created_at: now,
            updated_at: now,
        };
        let json = artifact.to_json("http://localhost:8000/");
        assert_eq!(
            json["file"],
            "http://localhost:8000/media/images/ab/cat-abcdef12.png"
        );
        assert_eq!(json["kind"], "image");
        assert_eq!(json["name"], "cat.png");
    }
}
