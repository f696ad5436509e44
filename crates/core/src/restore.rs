//! Restoring past versions.
//!
//! A restore never rewrites history: it appends a new head version whose body
//! equals the restored version's body, then records a [`RestoreRecord`]
//! linking the two. Restoring the same version twice yields two new versions
//! and two records.

use std::sync::Arc;

use tracing::info;

use crate::errors::VersionError;
use crate::models::{RestoreRecord, RestoreRequest, TenantId};
use crate::store::VersionStore;

pub use crate::models::RestoreOutcome;

/// Writes restores through a [`VersionStore`].
#[derive(Clone)]
pub struct RestoreCoordinator {
    store: Arc<dyn VersionStore>,
}

impl RestoreCoordinator {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }

    /// Restore `version_id` as the new head of its content item, attributed
    /// to `restored_by`. The new version and its record are written together.
    pub fn restore(
        &self,
        tenant: TenantId,
        version_id: i64,
        restored_by: i64,
        notes: Option<String>,
    ) -> Result<RestoreOutcome, VersionError> {
        let outcome = self.store.restore_version(
            tenant,
            RestoreRequest {
                version_id,
                restored_by,
                notes,
            },
        )?;

        info!(
            tenant_id = tenant.0,
            content_id = outcome.version.content_id,
            version_id,
            new_version_id = outcome.version.id,
            new_version_number = outcome.version.version_number,
            restored_by,
            "restored content version"
        );
        Ok(outcome)
    }

    /// Restore audit trail of a content item, newest first.
    pub fn history(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<RestoreRecord>, VersionError> {
        self.store.list_restores(tenant, content_id)
    }
}
