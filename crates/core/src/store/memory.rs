//! In-process [`VersionStore`] for embedded use and tests.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{info, warn};

use super::{ensure_tenant, VersionStore};
use crate::errors::VersionError;
use crate::models::{
    body_hash, ContentVersion, NewVersion, RestoreOutcome, RestoreRecord, RestoreRequest,
    TenantId,
};

#[derive(Default)]
struct MemoryState {
    /// Indexed by `id - 1`.
    versions: Vec<ContentVersion>,
    /// Per content item, indices into `versions` in version-number order.
    by_content: HashMap<i64, Vec<usize>>,
    restores: Vec<RestoreRecord>,
}

impl MemoryState {
    fn owner(&self, content_id: i64) -> Option<TenantId> {
        self.by_content
            .get(&content_id)
            .and_then(|idx| idx.first())
            .map(|&i| self.versions[i].tenant_id)
    }

    fn version(&self, id: i64) -> Option<&ContentVersion> {
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|i| self.versions.get(i))
    }

    /// Append `new` as the head of its content item. The caller has checked
    /// ownership.
    fn append(&mut self, tenant: TenantId, new: NewVersion) -> ContentVersion {
        let previous = self.by_content.get(&new.content_id).cloned().unwrap_or_default();
        for &i in &previous {
            self.versions[i].is_current = false;
        }

        let version = ContentVersion {
            id: self.versions.len() as i64 + 1,
            content_id: new.content_id,
            tenant_id: tenant,
            version_number: previous.len() as i64 + 1,
            body_hash: body_hash(&new.body),
            body: new.body,
            created_at: Utc::now(),
            author_id: new.author_id,
            is_current: true,
            tags: new.tags,
            restored_from: new.restored_from,
        };
        let index = self.versions.len();
        self.versions.push(version.clone());
        self.by_content.entry(new.content_id).or_default().push(index);
        version
    }
}

/// Version store held entirely in memory. Writers are serialised by the
/// state write lock, so version numbers never collide.
#[derive(Default)]
pub struct MemoryVersionStore {
    state: RwLock<MemoryState>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("memory store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("memory store lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn check_owner(
        state: &MemoryState,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<bool, VersionError> {
        match state.owner(content_id) {
            None => Ok(false),
            Some(owner) => {
                ensure_tenant(tenant, owner, || format!("content {content_id}")).map_err(|e| {
                    warn!(tenant_id = tenant.0, content_id, "cross-tenant access denied");
                    e
                })?;
                Ok(true)
            }
        }
    }
}

impl VersionStore for MemoryVersionStore {
    fn get_version(&self, tenant: TenantId, version_id: i64) -> Result<ContentVersion, VersionError> {
        let state = self.read();
        let version = state
            .version(version_id)
            .ok_or_else(|| VersionError::version_not_found(version_id))?;
        ensure_tenant(tenant, version.tenant_id, || format!("version {version_id}")).map_err(|e| {
            warn!(tenant_id = tenant.0, version_id, "cross-tenant access denied");
            e
        })?;
        Ok(version.clone())
    }

    fn list_versions(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<ContentVersion>, VersionError> {
        let state = self.read();
        if !Self::check_owner(&state, tenant, content_id)? {
            return Ok(Vec::new());
        }
        Ok(state.by_content[&content_id]
            .iter()
            .rev()
            .map(|&i| state.versions[i].clone())
            .collect())
    }

    fn create_version(
        &self,
        tenant: TenantId,
        new: NewVersion,
    ) -> Result<ContentVersion, VersionError> {
        let mut state = self.write();
        Self::check_owner(&state, tenant, new.content_id)?;
        let version = state.append(tenant, new);

        info!(
            tenant_id = tenant.0,
            content_id = version.content_id,
            version_id = version.id,
            version_number = version.version_number,
            "created content version"
        );
        Ok(version)
    }

    fn get_current(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<ContentVersion, VersionError> {
        let state = self.read();
        if !Self::check_owner(&state, tenant, content_id)? {
            return Err(VersionError::NotFound {
                entity: "content".into(),
                id: content_id.to_string(),
            });
        }
        state.by_content[&content_id]
            .iter()
            .map(|&i| &state.versions[i])
            .find(|v| v.is_current)
            .cloned()
            .ok_or_else(|| VersionError::NotFound {
                entity: "content".into(),
                id: content_id.to_string(),
            })
    }

    fn restore_version(
        &self,
        tenant: TenantId,
        request: RestoreRequest,
    ) -> Result<RestoreOutcome, VersionError> {
        let mut state = self.write();
        let source = state
            .version(request.version_id)
            .ok_or_else(|| VersionError::version_not_found(request.version_id))?
            .clone();
        ensure_tenant(tenant, source.tenant_id, || format!("version {}", source.id)).map_err(
            |e| {
                warn!(tenant_id = tenant.0, version_id = source.id, "cross-tenant access denied");
                e
            },
        )?;

        let version = state.append(
            tenant,
            NewVersion::new(source.content_id, source.body, request.restored_by)
                .with_tags(source.tags)
                .restored_from(source.id),
        );
        let record = RestoreRecord {
            id: state.restores.len() as i64 + 1,
            tenant_id: tenant,
            content_id: version.content_id,
            version_id: source.id,
            new_version_id: version.id,
            restored_by: request.restored_by,
            restored_at: Utc::now(),
            notes: request.notes,
        };
        state.restores.push(record.clone());

        info!(
            tenant_id = tenant.0,
            content_id = version.content_id,
            version_id = version.id,
            version_number = version.version_number,
            restore_id = record.id,
            "created restored content version"
        );
        Ok(RestoreOutcome { record, version })
    }

    fn list_restores(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<RestoreRecord>, VersionError> {
        let state = self.read();
        Self::check_owner(&state, tenant, content_id)?;
        Ok(state
            .restores
            .iter()
            .rev()
            .filter(|r| r.tenant_id == tenant && r.content_id == content_id)
            .cloned()
            .collect())
    }
}
