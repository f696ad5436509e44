//! Error types for the contentvc core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Version control errors
// ---------------------------------------------------------------------------

/// Errors surfaced by version storage, comparison, merge and restore
/// operations.
#[derive(Debug, Error)]
pub enum VersionError {
    /// The requested version or content does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The caller's tenant does not own the requested resource.
    #[error("tenant {tenant_id} may not access {resource}")]
    TenantMismatch { tenant_id: i64, resource: String },

    /// Two writers raced for the same version number and the retry lost too.
    #[error("concurrent modification of content {content_id} after {attempts} attempts")]
    ConcurrentModification { content_id: i64, attempts: u32 },

    /// A body exceeds the configured diff/merge size bound.
    #[error("body of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    /// A body still contains unresolved conflict markers.
    #[error("body contains {conflicts} unresolved conflict region(s)")]
    InvalidMergeState { conflicts: usize },

    /// A diff was applied to a body it was not computed from.
    #[error("patch does not apply: mismatch at line {line}")]
    PatchMismatch { line: usize },

    /// Underlying persistence failure.
    #[error("version store error: {0}")]
    Database(#[from] DatabaseError),
}

impl VersionError {
    /// Convenience constructor for a missing version row.
    pub fn version_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "version".into(),
            id: id.to_string(),
        }
    }

    /// Whether the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A JSON column could not be encoded or decoded.
    #[error("database column encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DatabaseError {
    /// Whether this error is a UNIQUE / PRIMARY KEY constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::SqliteError(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
                    && matches!(
                        err.extended_code,
                        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    )
            }
            _ => false,
        }
    }
}
