//! # Database Configuration
//!
//! Where the database lives and how search behaves.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     PENNY_DB_PATH=/data/penny.db                                        │
//! │     PENNY_MAX_SEARCH_TOKENS=4                                           │
//! │     PENNY_FTS_ENABLED=false                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/penny-pos/penny.toml (Linux)                              │
//! │     ~/Library/Application Support/com.penny.pos/penny.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # penny.toml
//! database_path = "/var/lib/penny/penny.db"
//! busy_timeout_secs = 5
//! journal_wal = true
//!
//! [search]
//! max_permuted_tokens = 5
//! fts_enabled = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use penny_core::search::DEFAULT_MAX_PERMUTED_TOKENS;

use crate::error::{DbError, DbResult};

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Search Settings
// =============================================================================

/// Knobs for paged fuzzy search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Phrases with more words than this skip the permutation clause and
    /// require every word to appear instead.
    /// Default: 5 (120 patterns per column)
    #[serde(default = "default_max_permuted_tokens")]
    pub max_permuted_tokens: usize,

    /// Whether repositories with an FTS table add the `MATCH` disjunct.
    /// Default: true
    #[serde(default = "default_true")]
    pub fts_enabled: bool,
}

fn default_max_permuted_tokens() -> usize {
    DEFAULT_MAX_PERMUTED_TOKENS
}

fn default_true() -> bool {
    true
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            max_permuted_tokens: default_max_permuted_tokens(),
            fts_enabled: true,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/penny.db")
///     .busy_timeout(Duration::from_secs(10))
///     .max_permuted_tokens(4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    #[serde(default = "DbConfig::default_database_path")]
    pub database_path: PathBuf,

    /// Create the file on first open.
    /// Default: true
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Enforce FOREIGN KEY constraints (off by default in SQLite itself).
    /// Default: true
    #[serde(default = "default_true")]
    pub foreign_keys: bool,

    /// How long a statement waits on a locked database.
    /// Default: 5 seconds
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,

    /// Use WAL journaling. Ignored for in-memory databases.
    /// Default: true
    #[serde(default = "default_true")]
    pub journal_wal: bool,

    #[serde(default)]
    pub search: SearchSettings,
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig::new(DbConfig::default_database_path())
    }
}

impl DbConfig {
    /// Creates a configuration for the database at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            create_if_missing: true,
            foreign_keys: true,
            busy_timeout_secs: default_busy_timeout(),
            journal_wal: true,
            search: SearchSettings::default(),
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::open(&DbConfig::in_memory()).await?;
    /// // Database is isolated and disappears with the handle
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            journal_wal: false,
            ..DbConfig::new(IN_MEMORY)
        }
    }

    /// Sets the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the permutation cap for fuzzy search.
    pub fn max_permuted_tokens(mut self, max: usize) -> Self {
        self.search.max_permuted_tokens = max;
        self
    }

    /// Enables or disables the FTS disjunct.
    pub fn fts_enabled(mut self, enabled: bool) -> Self {
        self.search.fts_enabled = enabled;
        self
    }

    /// Returns true for `:memory:` databases.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (penny.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading database config from file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    DbError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                config = toml::from_str(&contents).map_err(|e| {
                    DbError::Config(format!("cannot parse {}: {}", path.display(), e))
                })?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(DbError::Config("database_path must not be empty".into()));
        }

        if self.search.max_permuted_tokens == 0 {
            return Err(DbError::Config(
                "search.max_permuted_tokens must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("PENNY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("PENNY_MAX_SEARCH_TOKENS") {
            match max.parse::<usize>() {
                Ok(max) => self.search.max_permuted_tokens = max,
                Err(_) => warn!(value = %max, "Ignoring non-numeric PENNY_MAX_SEARCH_TOKENS"),
            }
        }

        if let Ok(enabled) = std::env::var("PENNY_FTS_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.search.fts_enabled = true,
                "0" | "false" | "no" => self.search.fts_enabled = false,
                _ => warn!(value = %enabled, "Unknown PENNY_FTS_ENABLED value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "penny", "pos")
            .map(|dirs| dirs.config_dir().join("penny.toml"))
    }

    /// Returns the platform data directory database path, or `penny.db` in
    /// the working directory when no home directory is known.
    pub fn default_database_path() -> PathBuf {
        directories::ProjectDirs::from("com", "penny", "pos")
            .map(|dirs| dirs.data_dir().join("penny.db"))
            .unwrap_or_else(|| PathBuf::from("penny.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DbConfig::new("/tmp/penny.db");
        assert!(config.create_if_missing);
        assert!(config.foreign_keys);
        assert_eq!(config.search.max_permuted_tokens, 5);
        assert!(config.search.fts_enabled);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[test]
    fn test_builder() {
        let config = DbConfig::in_memory()
            .busy_timeout(Duration::from_secs(9))
            .max_permuted_tokens(3)
            .fts_enabled(false);

        assert_eq!(config.busy_timeout_secs, 9);
        assert_eq!(config.search.max_permuted_tokens, 3);
        assert!(!config.search.fts_enabled);
    }

    #[test]
    fn test_validation() {
        let mut config = DbConfig::in_memory();
        assert!(config.validate().is_ok());

        config.search.max_permuted_tokens = 0;
        assert!(config.validate().is_err());

        config.search.max_permuted_tokens = 2;
        config.database_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "/srv/penny/shop.db"
journal_wal = false

[search]
max_permuted_tokens = 3
"#
        )
        .unwrap();

        let config = DbConfig::load(Some(file.path().to_path_buf())).unwrap();
        // PENNY_DB_PATH may be set by the environment running the tests
        if std::env::var("PENNY_DB_PATH").is_err() {
            assert_eq!(config.database_path, PathBuf::from("/srv/penny/shop.db"));
        }
        assert!(!config.journal_wal);
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout_secs, 5);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_path = [").unwrap();

        let err = DbConfig::load(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_toml_serialization() {
        let config = DbConfig::new("/tmp/penny.db");
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("database_path"));
        assert!(toml_str.contains("[search]"));
    }
}
