//! Configuration management for Corporatica using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repository::context::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "corporatica.db";

/// Default media subdirectory name.
const MEDIA_SUBDIR: &str = "media";

/// Default search index subdirectory name.
const INDEX_SUBDIR: &str = "indexdir";

/// Default upload size limit (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Placeholder secret used when none is configured.
const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Token signing settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// HMAC secret for signing JWTs.
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_ttl_secs: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: std::env::var("CORPORATICA_JWT_SECRET")
                .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string()),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7 * 24 * 3600,
        }
    }
}

impl AuthSettings {
    /// Check whether the signing secret is still the built-in placeholder.
    pub fn is_insecure_default(&self) -> bool {
        self.jwt_secret == INSECURE_DEFAULT_SECRET
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Root directory for uploaded artifacts and generated charts.
    pub media_dir: PathBuf,
    /// Directory holding the persistent search index.
    pub index_dir: PathBuf,
    /// Absolute base URL used when building artifact links.
    /// Derived from the request Host header when unset.
    pub public_url: Option<String>,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Token settings.
    pub auth: AuthSettings,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/corporatica/ for user data
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("corporatica");

        Self {
            media_dir: data_dir.join(MEDIA_SUBDIR),
            index_dir: data_dir.join(INDEX_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: std::env::var("DATABASE_URL").ok(),
            public_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            auth: AuthSettings::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            media_dir: data_dir.join(MEDIA_SUBDIR),
            index_dir: data_dir.join(INDEX_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            Self::log_directory_diagnostics(&self.data_dir, "data_dir");
            Self::log_directory_diagnostics(&self.media_dir, "media_dir");
        }

        for (dir, label) in [
            (&self.data_dir, "data"),
            (&self.media_dir, "media"),
            (&self.index_dir, "index"),
        ] {
            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create {} directory '{}': {}",
                        label,
                        dir.display(),
                        e
                    ),
                )
            })?;
        }
        Ok(())
    }

    /// Log diagnostic information about a directory for debugging (Unix only).
    #[cfg(unix)]
    fn log_directory_diagnostics(path: &Path, label: &str) {
        use std::os::unix::fs::MetadataExt;
        let uid = unsafe { libc::getuid() };
        let gid = unsafe { libc::getgid() };
        tracing::debug!(
            "{} check: path={}, running as uid={} gid={}",
            label,
            path.display(),
            uid,
            gid
        );

        match fs::metadata(path) {
            Ok(meta) => tracing::debug!(
                "{} exists: owner={}:{}, mode={:o}, is_dir={}",
                label,
                meta.uid(),
                meta.gid(),
                meta.mode() & 0o7777,
                meta.is_dir()
            ),
            Err(_) => tracing::debug!("{} does not exist, will attempt to create", label),
        }
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }
}

/// Authentication section of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct AuthConfig {
    /// JWT signing secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_ttl_secs: Option<i64>,
    /// Refresh token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_ttl_secs: Option<i64>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Media directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_dir: Option<String>,
    /// Search index directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_dir: Option<String>,
    /// Absolute base URL for artifact links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    /// Upload size limit in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
    /// Token settings.
    #[serde(default)]
    #[prefer(default)]
    pub auth: AuthConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    pub async fn load() -> Self {
        match prefer::load("corporatica").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found, use defaults
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.media_dir = settings.data_dir.join(MEDIA_SUBDIR);
            settings.index_dir = settings.data_dir.join(INDEX_SUBDIR);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref media_dir) = self.media_dir {
            settings.media_dir = self.resolve_path(media_dir, base_dir);
        }
        if let Some(ref index_dir) = self.index_dir {
            settings.index_dir = self.resolve_path(index_dir, base_dir);
        }
        if let Some(ref public_url) = self.public_url {
            settings.public_url = Some(public_url.trim_end_matches('/').to_string());
        }
        if let Some(limit) = self.max_upload_bytes {
            settings.max_upload_bytes = limit;
        }
        // Environment wins over the file for the signing secret
        if std::env::var("CORPORATICA_JWT_SECRET").is_err() {
            if let Some(ref secret) = self.auth.jwt_secret {
                settings.auth.jwt_secret = secret.clone();
            }
        }
        if let Some(ttl) = self.auth.access_token_ttl_secs {
            settings.auth.access_token_ttl_secs = ttl;
        }
        if let Some(ttl) = self.auth.refresh_token_ttl_secs {
            settings.auth.refresh_token_ttl_secs = ttl;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Default)]
pub struct LoadOptions {
    /// Explicit config file path.
    pub config_path: Option<PathBuf>,
    /// Data directory override (from --target).
    pub target: Option<PathBuf>,
}

/// Load settings, applying the config file and CLI overrides in that order.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => match Config::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                Config::default()
            }
        },
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(target) = options.target {
        let data_dir = config.resolve_path(&target.to_string_lossy(), &base_dir);
        settings.media_dir = data_dir.join(MEDIA_SUBDIR);
        settings.index_dir = data_dir.join(INDEX_SUBDIR);
        settings.data_dir = data_dir;
    }

    if settings.auth.is_insecure_default() {
        tracing::warn!(
            "No JWT secret configured; set CORPORATICA_JWT_SECRET before exposing the server"
        );
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_with_data_dir_derives_subdirs() {
        let settings = Settings::with_data_dir(PathBuf::from("/srv/corp"));
        assert_eq!(settings.media_dir, PathBuf::from("/srv/corp/media"));
        assert_eq!(settings.index_dir, PathBuf::from("/srv/corp/indexdir"));
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/srv/corp/corporatica.db")
        );
    }

    #[test]
    fn test_resolve_path_relative_and_absolute() {
        let config = Config::default();
        let base = Path::new("/etc/corporatica");
        assert_eq!(
            config.resolve_path("data", base),
            PathBuf::from("/etc/corporatica/data")
        );
        assert_eq!(
            config.resolve_path("/var/lib/corp", base),
            PathBuf::from("/var/lib/corp")
        );
    }

    #[tokio::test]
    async fn test_load_toml_and_apply() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corporatica.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "store"
public_url = "https://api.example.com/"
max_upload_bytes = 1024

[auth]
access_token_ttl_secs = 60
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, &config.base_dir().unwrap());

        assert_eq!(settings.data_dir, dir.path().join("store"));
        assert_eq!(settings.media_dir, dir.path().join("store").join("media"));
        assert_eq!(
            settings.public_url.as_deref(),
            Some("https://api.example.com")
        );
        assert_eq!(settings.max_upload_bytes, 1024);
        assert_eq!(settings.auth.access_token_ttl_secs, 60);
    }

    #[tokio::test]
    async fn test_load_invalid_json_reports_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corporatica.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(err.contains("Failed to parse JSON config"));
    }
}
