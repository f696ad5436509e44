//! Version persistence boundary.
//!
//! [`VersionStore`] is the logical interface the rest of the core uses to
//! read and append content versions. Every call takes the caller's
//! [`TenantId`] and every implementation rejects cross-tenant access with
//! [`VersionError::TenantMismatch`].
//!
//! Two backends are provided:
//! - [`SqliteVersionStore`] -- durable, backed by [`Database`](crate::db::Database).
//! - [`MemoryVersionStore`] -- embedded, serialising writers under one
//!   write lock.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryVersionStore;
pub use sqlite::SqliteVersionStore;

use tracing::warn;

use crate::errors::VersionError;
use crate::models::{
    ContentVersion, NewVersion, RestoreOutcome, RestoreRecord, RestoreRequest, TenantId,
};

/// Number of attempts `create_version` makes before surfacing
/// [`VersionError::ConcurrentModification`].
pub const CREATE_ATTEMPTS: u32 = 2;

/// Tenant-scoped, append-only storage of content versions.
pub trait VersionStore: Send + Sync {
    /// Fetch a single version.
    fn get_version(&self, tenant: TenantId, version_id: i64) -> Result<ContentVersion, VersionError>;

    /// All versions of a content item, ordered by `version_number` descending.
    /// An unknown content item yields an empty list.
    fn list_versions(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<ContentVersion>, VersionError>;

    /// Append a new head version, assigning the next version number.
    fn create_version(
        &self,
        tenant: TenantId,
        new: NewVersion,
    ) -> Result<ContentVersion, VersionError>;

    /// The head version of a content item.
    fn get_current(&self, tenant: TenantId, content_id: i64)
        -> Result<ContentVersion, VersionError>;

    /// Append a copy of `request.version_id` as the new head and record the
    /// restore. Either both the version and its record are written or
    /// neither is.
    fn restore_version(
        &self,
        tenant: TenantId,
        request: RestoreRequest,
    ) -> Result<RestoreOutcome, VersionError>;

    /// Restore records of a content item, newest first.
    fn list_restores(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<RestoreRecord>, VersionError>;
}

/// Run `op`, retrying once when it loses a version-number race.
///
/// A second loss is surfaced as [`VersionError::ConcurrentModification`]
/// with the total number of attempts.
pub fn retry_on_race<T, F>(content_id: i64, mut op: F) -> Result<T, VersionError>
where
    F: FnMut() -> Result<T, VersionError>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Err(VersionError::ConcurrentModification { .. }) if attempt < CREATE_ATTEMPTS => {
                warn!(content_id, attempt, "version number race lost, retrying");
                attempt += 1;
            }
            Err(VersionError::ConcurrentModification { .. }) => {
                return Err(VersionError::ConcurrentModification {
                    content_id,
                    attempts: attempt,
                });
            }
            other => return other,
        }
    }
}

/// Reject access when `owner` differs from the caller's tenant.
pub(crate) fn ensure_tenant(
    tenant: TenantId,
    owner: TenantId,
    resource: impl FnOnce() -> String,
) -> Result<(), VersionError> {
    if tenant == owner {
        Ok(())
    } else {
        Err(VersionError::TenantMismatch {
            tenant_id: tenant.0,
            resource: resource(),
        })
    }
}
