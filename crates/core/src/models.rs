//! Domain model types used throughout contentvc.
//!
//! These types bridge the version store, the comparison/merge engines, and
//! the web API.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Tenant
// ---------------------------------------------------------------------------

/// Tenant isolation boundary. Supplied by the caller on every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Content versions
// ---------------------------------------------------------------------------

/// An immutable snapshot of a content item's body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: i64,
    pub content_id: i64,
    pub tenant_id: TenantId,
    /// Monotonic per content item, starting at 1.
    pub version_number: i64,
    pub body: String,
    /// SHA-256 of `body`, hex encoded.
    pub body_hash: String,
    pub created_at: DateTime<Utc>,
    pub author_id: i64,
    pub is_current: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Source version when this version was produced by a restore.
    pub restored_from: Option<i64>,
}

/// Input to `VersionStore::create_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub content_id: i64,
    pub body: String,
    pub author_id: i64,
    pub tags: BTreeSet<String>,
    pub restored_from: Option<i64>,
}

impl NewVersion {
    pub fn new(content_id: i64, body: impl Into<String>, author_id: i64) -> Self {
        Self {
            content_id,
            body: body.into(),
            author_id,
            tags: BTreeSet::new(),
            restored_from: None,
        }
    }

    /// Attach tags to the version being created.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the version as the product of restoring `source_version_id`.
    pub fn restored_from(mut self, source_version_id: i64) -> Self {
        self.restored_from = Some(source_version_id);
        self
    }
}

/// Hex-encoded SHA-256 digest of a version body.
pub fn body_hash(body: &str) -> String {
    hex::encode(Sha256::digest(body.as_bytes()))
}

// ---------------------------------------------------------------------------
// Restore records
// ---------------------------------------------------------------------------

/// Append-only audit record of a single restore action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreRecord {
    pub id: i64,
    pub tenant_id: TenantId,
    pub content_id: i64,
    /// The version whose body was restored.
    pub version_id: i64,
    /// The version created by the restore.
    pub new_version_id: i64,
    pub restored_by: i64,
    pub restored_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// A request to restore `version_id` as the new head of its content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    pub version_id: i64,
    pub restored_by: i64,
    pub notes: Option<String>,
}

/// Outcome of a restore: the audit record and the version it created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub record: RestoreRecord,
    pub version: ContentVersion,
}

/// Restore record row, written together with the version it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRestoreRecord {
    pub content_id: i64,
    pub version_id: i64,
    pub new_version_id: i64,
    pub restored_by: i64,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

/// Actions written to the audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    VersionCreated,
    VersionRestored,
    TenantMismatch,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VersionCreated => write!(f, "version_created"),
            Self::VersionRestored => write!(f, "version_restored"),
            Self::TenantMismatch => write!(f, "tenant_mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_hash_is_stable() {
        assert_eq!(
            body_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(body_hash("Hello world"), body_hash("Hello world"));
        assert_ne!(body_hash("Hello world"), body_hash("Hello world "));
    }

    #[test]
    fn test_new_version_builder() {
        let v = NewVersion::new(42, "body", 3)
            .with_tags(["draft", "seo", "draft"])
            .restored_from(9);
        assert_eq!(v.tags.len(), 2);
        assert_eq!(v.restored_from, Some(9));
    }

    #[test]
    fn test_tenant_id_serializes_transparently() {
        assert_eq!(serde_json::to_string(&TenantId(7)).unwrap(), "7");
        assert_eq!(AuditAction::TenantMismatch.to_string(), "tenant_mismatch");
    }
}
