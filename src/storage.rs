//! On-disk content store for uploaded payloads.
//!
//! Files live under the media root in a two-level layout keyed by content hash:
//! `{media}/{kind dir}/{hash[0..2]}/{sanitized_basename}-{hash[0..8]}.{ext}`.
//! Paths recorded in the database are relative to the media root.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::models::{ArtifactKind, StoredArtifact};

/// Fixed location of the generated dataset chart, relative to the media root.
pub const CHART_FILENAME: &str = "plot.png";

/// Result of writing a payload to the store.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Path relative to the media root, `/`-separated.
    pub relative_path: String,
    pub content_hash: String,
    pub content_type: String,
    pub file_size: u64,
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a stored relative path.
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write a payload and return where it landed.
    ///
    /// Identical content uploaded under the same name maps to the same file.
    pub async fn save(
        &self,
        kind: ArtifactKind,
        name: &str,
        content: &[u8],
    ) -> std::io::Result<StoredFile> {
        let content_hash = StoredArtifact::compute_hash(content);
        let content_type = detect_content_type(kind, name, content);
        let (basename, extension) = split_filename(name, &content_type);

        let relative_path = format!(
            "{}/{}/{}-{}.{}",
            kind.storage_dir(),
            &content_hash[..2],
            sanitize_filename(&basename),
            &content_hash[..8],
            extension
        );
        let path = self.absolute(&relative_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        Ok(StoredFile {
            relative_path,
            content_hash,
            content_type,
            file_size: content.len() as u64,
        })
    }

    pub async fn read(&self, relative: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.absolute(relative)).await
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.absolute(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Replace `relative` with `content` via a temp file and rename, so readers
    /// never observe a partially written file.
    pub fn write_atomic(&self, relative: &str, content: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.absolute(relative);
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }

    /// Resolve a request path to a file inside the media root.
    ///
    /// Returns None for traversal attempts, symlinks escaping the root, and
    /// missing files.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let requested = Path::new(request_path.trim_start_matches('/'));
        if requested
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        let root = self.root.canonicalize().ok()?;
        let full = root.join(requested).canonicalize().ok()?;
        if full.starts_with(&root) && full.is_file() {
            Some(full)
        } else {
            None
        }
    }
}

/// Determine a payload's MIME type from its bytes, then its name.
pub fn detect_content_type(kind: ArtifactKind, name: &str, content: &[u8]) -> String {
    if let Some(t) = infer::get(content) {
        return t.mime_type().to_string();
    }
    if let Some(mime) = mime_guess::from_path(name).first() {
        return mime.essence_str().to_string();
    }
    match kind {
        ArtifactKind::Image => "application/octet-stream".to_string(),
        ArtifactKind::Dataset => "text/csv".to_string(),
    }
}

/// Split an upload name into basename and extension, falling back to the
/// MIME type's extension when the name has none.
pub fn split_filename(name: &str, content_type: &str) -> (String, String) {
    let filename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if let Some(dot_pos) = filename.rfind('.') {
        let basename = &filename[..dot_pos];
        let ext = &filename[dot_pos + 1..];
        if !basename.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return (basename.to_string(), ext.to_lowercase());
        }
    }
    let basename = if filename.is_empty() { "upload" } else { filename };
    (basename.to_string(), mime_to_extension(content_type).to_string())
}

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' | ' ' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = sanitized.trim().trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.chars().take(100).collect()
    }
}

/// Map MIME type to file extension.
pub fn mime_to_extension(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        "image/webp" => "webp",
        "image/x-tga" => "tga",
        "text/csv" => "csv",
        "text/plain" => "txt",
        "application/json" => "json",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Report (2024)"), "My_Report_(2024)");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("///"), "upload");
        assert_eq!(sanitize_filename(&"é".repeat(150)).chars().count(), 100);
    }

    #[test]
    fn test_split_filename() {
        assert_eq!(
            split_filename("photo.JPG", "image/jpeg"),
            ("photo".to_string(), "jpg".to_string())
        );
        assert_eq!(
            split_filename("data", "text/csv"),
            ("data".to_string(), "csv".to_string())
        );
        assert_eq!(
            split_filename("C:\\tmp\\scan.png", "image/png"),
            ("scan".to_string(), "png".to_string())
        );
    }

    #[tokio::test]
    async fn test_save_layout_and_remove() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());

        let stored = store
            .save(ArtifactKind::Dataset, "sales figures.csv", b"a,b\n1,2\n")
            .await
            .unwrap();
        let hash = &stored.content_hash;
        assert_eq!(
            stored.relative_path,
            format!("uploads/{}/sales_figures-{}.csv", &hash[..2], &hash[..8])
        );
        assert_eq!(stored.content_type, "text/csv");
        assert_eq!(stored.file_size, 8);
        assert_eq!(store.read(&stored.relative_path).await.unwrap(), b"a,b\n1,2\n");

        store.remove(&stored.relative_path).await.unwrap();
        assert!(!store.absolute(&stored.relative_path).exists());
        // Second removal is a no-op
        store.remove(&stored.relative_path).await.unwrap();
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        store.write_atomic(CHART_FILENAME, b"first").unwrap();
        let path = store.write_atomic(CHART_FILENAME, b"second").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempdir().unwrap();
        let media = dir.path().join("media");
        std::fs::create_dir_all(media.join("images")).unwrap();
        std::fs::write(media.join("images/a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"x").unwrap();

        let store = ContentStore::new(&media);
        assert!(store.resolve("images/a.png").is_some());
        assert!(store.resolve("/images/a.png").is_some());
        assert!(store.resolve("../secret.txt").is_none());
        assert!(store.resolve("images/../../secret.txt").is_none());
        assert!(store.resolve("images/missing.png").is_none());
        assert!(store.resolve("images").is_none());
    }
}
