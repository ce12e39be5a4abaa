//! Configuration management for redline.
//!
//! Settings come from, lowest to highest priority: built-in defaults, an
//! optional config file (TOML or JSON), environment variables, CLI flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "redline.db";

/// Default base URL of the extraction service.
pub const DEFAULT_EXTRACTOR_URL: &str = "http://127.0.0.1:8000/api/v1";

/// Default documents subdirectory name.
const DOCUMENTS_SUBDIR: &str = "documents";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    /// Supports sqlite: URLs. Set via DATABASE_URL env var or config.
    pub database_url: Option<String>,
    /// Directory for storing uploaded document binaries.
    pub documents_dir: PathBuf,
    /// Base URL of the extraction service.
    pub extractor_url: String,
    /// Per-stage request timeout in seconds.
    pub request_timeout: u64,
    /// Seconds before an in-flight document counts as stuck.
    pub staleness_secs: u64,
    /// Maximum documents restarted per recovery sweep.
    pub recovery_limit: i64,
    /// Default bind address for the web server.
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/redline/ for user data
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("redline");

        Self {
            documents_dir: data_dir.join(DOCUMENTS_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            extractor_url: DEFAULT_EXTRACTOR_URL.to_string(),
            request_timeout: 300,
            staleness_secs: crate::services::DEFAULT_STALENESS.as_secs(),
            recovery_limit: crate::services::DEFAULT_RECOVERY_LIMIT,
            bind: "127.0.0.1:3030".to_string(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    #[allow(dead_code)]
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            documents_dir: data_dir.join(DOCUMENTS_SUBDIR),
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            let path = self.data_dir.join(&self.database_filename);
            format!("sqlite:{}", path.display())
        }
    }

    /// Check if using an explicit database URL (vs file path).
    pub fn has_database_url(&self) -> bool {
        self.database_url.is_some()
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        if self.has_database_url() {
            true // Explicit URL - connection errors surface elsewhere
        } else {
            self.database_path().exists()
        }
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })?;
        fs::create_dir_all(&self.documents_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create documents directory '{}': {}",
                    self.documents_dir.display(),
                    e
                ),
            )
        })?;
        Ok(())
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url(), &self.documents_dir)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Base URL of the extraction service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor_url: Option<String>,
    /// Per-stage request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Seconds before an in-flight document counts as stuck.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staleness_secs: Option<u64>,
    /// Maximum documents restarted per recovery sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_limit: Option<i64>,
    /// Default bind address for the web server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file path.
    /// Supports TOML and JSON based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
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
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.documents_dir = settings.data_dir.join(DOCUMENTS_SUBDIR);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref url) = self.extractor_url {
            settings.extractor_url = url.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(staleness) = self.staleness_secs {
            settings.staleness_secs = staleness;
        }
        if let Some(limit) = self.recovery_limit {
            settings.recovery_limit = limit;
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory or database file (--data flag).
    /// Can be a directory containing redline.db or a .db file directly.
    pub data: Option<PathBuf>,
}

/// Resolved data path information.
#[derive(Debug, Clone)]
pub struct ResolvedData {
    /// The database filename.
    pub database_filename: String,
    /// Full path to the database.
    pub database_path: PathBuf,
}

impl ResolvedData {
    /// Resolve a data path to database filename and path.
    /// - If path is a .db file, extract filename and use as path
    /// - If path is a directory, look for redline.db inside
    pub fn from_path(path: &Path) -> Self {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(path)
        };

        let is_db_file = path
            .extension()
            .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
            || (path.exists() && path.is_file());

        if is_db_file {
            let database_filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_DATABASE_FILENAME)
                .to_string();
            Self {
                database_filename,
                database_path: path,
            }
        } else {
            // It's a directory
            let database_filename = DEFAULT_DATABASE_FILENAME.to_string();
            let database_path = path.join(&database_filename);
            Self {
                database_filename,
                database_path,
            }
        }
    }
}

/// Look for a config file next to the database.
/// Checks for redline.{ext} and config.{ext} in supported formats.
fn find_config_next_to_db(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "json"];
    let basenames = ["redline", "config"];

    for basename in basenames {
        for ext in extensions {
            let path = data_dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Resolve data path to a directory.
/// If path points to a .db file, returns its parent directory.
fn resolve_data_path_to_dir(path: &Path) -> PathBuf {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    if path
        .extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
    {
        path.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        path
    }
}

/// Load config from the appropriate source based on options.
async fn load_file_config(options: &LoadOptions, data_dir_override: Option<&PathBuf>) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_default();
    }

    // Priority 2: Config next to data dir
    if let Some(data_dir) = data_dir_override {
        if let Some(config_path) = find_config_next_to_db(data_dir) {
            tracing::debug!("Found config next to data dir: {}", config_path.display());
            return Config::load_from_path(&config_path)
                .await
                .unwrap_or_default();
        }
    }

    // Priority 3: Config in the current directory
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(config_path) = find_config_next_to_db(&cwd) {
            tracing::debug!("Found config in CWD: {}", config_path.display());
            return Config::load_from_path(&config_path)
                .await
                .unwrap_or_default();
        }
    }

    Config::default()
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let data_dir_override = options.data.as_ref().map(|d| resolve_data_path_to_dir(d));
    let resolved_data = options.data.as_ref().map(|d| ResolvedData::from_path(d));

    let config = load_file_config(&options, data_dir_override.as_ref()).await;

    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --data override takes precedence for data_dir and documents_dir
    if let Some(data_dir) = data_dir_override {
        settings.data_dir = data_dir;
        settings.documents_dir = settings.data_dir.join(DOCUMENTS_SUBDIR);
    }
    if let Some(resolved) = resolved_data {
        settings.database_filename = resolved.database_filename;
    }

    // DATABASE_URL environment variable takes highest precedence
    if let Some(database_url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using DATABASE_URL from environment");
        settings.database_url = Some(database_url);
    }

    // REDLINE_EXTRACTOR_URL environment variable takes precedence over config
    if let Some(url) = std::env::var("REDLINE_EXTRACTOR_URL")
        .ok()
        .filter(|s| !s.is_empty())
    {
        tracing::debug!("Using REDLINE_EXTRACTOR_URL from environment: {}", url);
        settings.extractor_url = url;
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_toml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redline.toml");
        std::fs::write(
            &path,
            "data_dir = \"./contracts\"\nextractor_url = \"http://10.0.0.5:9000/api/v1\"\nrequest_timeout = 60\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("./contracts"));
        assert_eq!(config.request_timeout, Some(60));

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());
        assert_eq!(settings.data_dir, dir.path().join("./contracts"));
        assert_eq!(
            settings.documents_dir,
            dir.path().join("./contracts").join("documents")
        );
        assert_eq!(settings.extractor_url, "http://10.0.0.5:9000/api/v1");
        assert_eq!(settings.request_timeout, 60);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{\"database\": \"contracts.db\", \"recovery_limit\": 25}").unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, dir.path());
        assert_eq!(settings.database_filename, "contracts.db");
        assert_eq!(settings.recovery_limit, 25);
        // Untouched fields keep their defaults.
        assert_eq!(settings.staleness_secs, 300);
    }

    #[test]
    fn test_resolved_data_from_db_file() {
        let resolved = ResolvedData::from_path(Path::new("/srv/redline/archive.db"));
        assert_eq!(resolved.database_filename, "archive.db");
        assert_eq!(
            resolved.database_path,
            PathBuf::from("/srv/redline/archive.db")
        );
    }

    #[test]
    fn test_resolved_data_from_directory() {
        let resolved = ResolvedData::from_path(Path::new("/srv/redline"));
        assert_eq!(resolved.database_filename, DEFAULT_DATABASE_FILENAME);
        assert_eq!(
            resolved.database_path,
            PathBuf::from("/srv/redline").join(DEFAULT_DATABASE_FILENAME)
        );
    }
}
