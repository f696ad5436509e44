//! SQLite-backed [`VersionStore`].
//!
//! Version numbers are assigned inside an immediate transaction and guarded
//! by the `UNIQUE (content_id, version_number)` constraint; a constraint
//! violation is reported as a lost race and retried once.

use std::sync::Arc;

use rusqlite::Connection;
use tracing::{info, warn};

use super::{ensure_tenant, retry_on_race, VersionStore};
use crate::db::{queries, Database};
use crate::errors::VersionError;
use crate::models::{
    AuditAction, ContentVersion, NewRestoreRecord, NewVersion, RestoreOutcome, RestoreRecord,
    RestoreRequest, TenantId,
};

/// Durable version store over a shared [`Database`] handle.
#[derive(Clone)]
pub struct SqliteVersionStore {
    db: Arc<Database>,
}

impl SqliteVersionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The underlying database, for audit-log queries.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Record a denied cross-tenant access. Failure to write the audit row is
    /// logged but does not mask the original error.
    fn audit_mismatch(
        &self,
        conn: &Connection,
        tenant: TenantId,
        content_id: Option<i64>,
        version_id: Option<i64>,
        err: &VersionError,
    ) {
        warn!(tenant_id = tenant.0, ?content_id, ?version_id, "cross-tenant access denied");
        if let Err(e) = queries::insert_audit_log(
            conn,
            tenant,
            AuditAction::TenantMismatch,
            content_id,
            version_id,
            None,
            Some(&err.to_string()),
        ) {
            warn!(error = %e, "failed to write tenant mismatch audit entry");
        }
    }

    /// Reject `content_id` when another tenant owns it.
    fn check_content_owner(
        &self,
        conn: &Connection,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<bool, VersionError> {
        match queries::content_owner(conn, content_id)? {
            None => Ok(false),
            Some(owner) => {
                if let Err(e) = ensure_tenant(tenant, owner, || format!("content {content_id}")) {
                    self.audit_mismatch(conn, tenant, Some(content_id), None, &e);
                    return Err(e);
                }
                Ok(true)
            }
        }
    }

    fn try_create(&self, tenant: TenantId, new: &NewVersion) -> Result<ContentVersion, VersionError> {
        self.db.transaction(|conn| append_version(conn, tenant, new))
    }

    /// Copy the source version to a new head and write its restore record in
    /// one transaction.
    fn try_restore(
        &self,
        tenant: TenantId,
        request: &RestoreRequest,
    ) -> Result<RestoreOutcome, VersionError> {
        let source_id = request.version_id;
        self.db.transaction(|conn| {
            let source = queries::get_version(conn, source_id)?
                .ok_or_else(|| VersionError::version_not_found(source_id))?;
            ensure_tenant(tenant, source.tenant_id, || format!("version {source_id}"))?;

            let new = NewVersion::new(source.content_id, source.body, request.restored_by)
                .with_tags(source.tags)
                .restored_from(source.id);
            let version = append_version(conn, tenant, &new)?;

            let record = queries::insert_restore_record(
                conn,
                tenant,
                &NewRestoreRecord {
                    content_id: version.content_id,
                    version_id: source.id,
                    new_version_id: version.id,
                    restored_by: request.restored_by,
                    notes: request.notes.clone(),
                },
            )?;
            queries::insert_audit_log(
                conn,
                tenant,
                AuditAction::VersionRestored,
                Some(version.content_id),
                Some(version.id),
                Some(request.restored_by),
                request.notes.as_deref(),
            )?;
            Ok(RestoreOutcome { record, version })
        })
    }
}

/// Insert `new` as the next version of its content item. Must run inside a
/// transaction; a lost version-number race is reported as
/// [`VersionError::ConcurrentModification`].
fn append_version(
    conn: &Connection,
    tenant: TenantId,
    new: &NewVersion,
) -> Result<ContentVersion, VersionError> {
    let content_id = new.content_id;
    if let Some(owner) = queries::content_owner(conn, content_id)? {
        ensure_tenant(tenant, owner, || format!("content {content_id}"))?;
    }
    let next = queries::max_version_number(conn, content_id)? + 1;
    let version = queries::insert_version(conn, tenant, new, next).map_err(|e| {
        if e.is_unique_violation() {
            VersionError::ConcurrentModification {
                content_id,
                attempts: 1,
            }
        } else {
            e.into()
        }
    })?;
    queries::insert_audit_log(
        conn,
        tenant,
        AuditAction::VersionCreated,
        Some(content_id),
        Some(version.id),
        Some(new.author_id),
        None,
    )?;
    Ok(version)
}

impl VersionStore for SqliteVersionStore {
    fn get_version(&self, tenant: TenantId, version_id: i64) -> Result<ContentVersion, VersionError> {
        let conn = self.db.conn();
        let version = queries::get_version(&conn, version_id)?
            .ok_or_else(|| VersionError::version_not_found(version_id))?;
        if let Err(e) = ensure_tenant(tenant, version.tenant_id, || format!("version {version_id}")) {
            self.audit_mismatch(&conn, tenant, Some(version.content_id), Some(version_id), &e);
            return Err(e);
        }
        Ok(version)
    }

    fn list_versions(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<ContentVersion>, VersionError> {
        let conn = self.db.conn();
        if !self.check_content_owner(&conn, tenant, content_id)? {
            return Ok(Vec::new());
        }
        Ok(queries::list_versions(&conn, content_id)?)
    }

    fn create_version(
        &self,
        tenant: TenantId,
        new: NewVersion,
    ) -> Result<ContentVersion, VersionError> {
        let content_id = new.content_id;
        match retry_on_race(content_id, || self.try_create(tenant, &new)) {
            Ok(version) => {
                info!(
                    tenant_id = tenant.0,
                    content_id,
                    version_id = version.id,
                    version_number = version.version_number,
                    "created content version"
                );
                Ok(version)
            }
            Err(e @ VersionError::TenantMismatch { .. }) => {
                // The transaction rolled back; audit outside of it.
                let conn = self.db.conn();
                self.audit_mismatch(&conn, tenant, Some(content_id), None, &e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn get_current(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<ContentVersion, VersionError> {
        let conn = self.db.conn();
        self.check_content_owner(&conn, tenant, content_id)?;
        queries::current_version(&conn, content_id)?.ok_or_else(|| VersionError::NotFound {
            entity: "content".into(),
            id: content_id.to_string(),
        })
    }

    fn restore_version(
        &self,
        tenant: TenantId,
        request: RestoreRequest,
    ) -> Result<RestoreOutcome, VersionError> {
        // Resolves not-found and audits a cross-tenant source before writing.
        let source = self.get_version(tenant, request.version_id)?;
        let outcome = retry_on_race(source.content_id, || self.try_restore(tenant, &request))?;
        info!(
            tenant_id = tenant.0,
            content_id = outcome.version.content_id,
            version_id = outcome.version.id,
            version_number = outcome.version.version_number,
            restore_id = outcome.record.id,
            "created restored content version"
        );
        Ok(outcome)
    }

    fn list_restores(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<RestoreRecord>, VersionError> {
        let conn = self.db.conn();
        self.check_content_owner(&conn, tenant, content_id)?;
        Ok(queries::list_restore_records(&conn, tenant, content_id)?)
    }
}
