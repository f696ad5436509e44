//! TOML-based configuration system for contentvc.
//!
//! Every section has defaults, so an empty file is a valid configuration.
//! The database location may be overridden at runtime by naming an
//! environment variable in `storage.database_path_env`; the override is
//! applied by [`AppConfig::resolve_env_vars`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conflict::markers::NO_NEWLINE_TAG;
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Size bounds for diff and merge computation.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Comparison cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Conflict marker labels.
    #[serde(default)]
    pub merge: MergeConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP listener and logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:3000`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen() -> String {
    "127.0.0.1:3000".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Environment variable that, when set, overrides `database_path`.
    #[serde(default)]
    pub database_path_env: Option<String>,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("contentvc.db")
}
fn default_busy_timeout() -> u64 {
    5000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            database_path_env: None,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Bounds on diff / merge input sizes and diff cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest body, in bytes, accepted by diff and merge (default 2 MiB).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Time allowed for the line diff search before it gives up on a
    /// minimal script (default 2000 ms).
    #[serde(default = "default_diff_timeout_ms")]
    pub diff_timeout_ms: u64,

    /// Edited lines (deleted plus inserted) above which a diff is reported
    /// as one whole-body `modify` (default 100 000).
    #[serde(default = "default_max_edit_lines")]
    pub max_edit_lines: usize,
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_diff_timeout_ms() -> u64 {
    2000
}
fn default_max_edit_lines() -> usize {
    100_000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            diff_timeout_ms: default_diff_timeout_ms(),
            max_edit_lines: default_max_edit_lines(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Comparison cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached diff results before LRU eviction.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_capacity() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Labels written after conflict markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_ours_label")]
    pub ours_label: String,

    #[serde(default = "default_theirs_label")]
    pub theirs_label: String,

    #[serde(default = "default_base_label")]
    pub base_label: String,
}

fn default_ours_label() -> String {
    "version A".into()
}
fn default_theirs_label() -> String {
    "version B".into()
}
fn default_base_label() -> String {
    "base".into()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            ours_label: default_ours_label(),
            theirs_label: default_theirs_label(),
            base_label: default_base_label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** apply environment overrides -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Apply environment-variable overrides.
    ///
    /// A referenced variable that is unset or empty logs a warning and leaves
    /// the file value in place.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.storage.database_path_env {
            if let Some(path) = resolve_optional_env(env_name, "storage.database_path_env") {
                self.storage.database_path = PathBuf::from(path);
            }
        }
        Ok(())
    }

    /// Validate that all values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "server.listen".into(),
                detail: format!("'{}' is not a socket address", self.server.listen),
            });
        }
        if self.storage.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.database_path".into(),
                detail: "database path must not be empty".into(),
            });
        }
        if self.limits.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_body_bytes".into(),
                detail: "body limit must be > 0".into(),
            });
        }
        if self.limits.diff_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.diff_timeout_ms".into(),
                detail: "diff timeout must be > 0".into(),
            });
        }
        if self.limits.max_edit_lines == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_edit_lines".into(),
                detail: "edit line cap must be > 0".into(),
            });
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.capacity".into(),
                detail: "cache capacity must be > 0".into(),
            });
        }
        for (field, label) in [
            ("merge.ours_label", &self.merge.ours_label),
            ("merge.theirs_label", &self.merge.theirs_label),
            ("merge.base_label", &self.merge.base_label),
        ] {
            if label.trim().is_empty() || label.contains('\n') {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "marker label must be a non-empty single line".into(),
                });
            }
            if label.ends_with(NO_NEWLINE_TAG.trim_start()) {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: format!("marker label must not end with '{}'", NO_NEWLINE_TAG.trim_start()),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// A commented default configuration, as written by `contentvc init`.
    pub fn default_toml() -> &'static str {
        r#"# contentvc configuration

[server]
listen = "127.0.0.1:3000"
log_level = "info"

[storage]
database_path = "contentvc.db"
# database_path_env = "CONTENTVC_DATABASE"
busy_timeout_ms = 5000

[limits]
max_body_bytes = 2097152
diff_timeout_ms = 2000
max_edit_lines = 100000

[cache]
capacity = 1024

[merge]
ours_label = "version A"
theirs_label = "version B"
base_label = "base"
"#
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
