//! The [`VersionControl`] facade.
//!
//! Wires a [`VersionStore`], the diff and merge engines, the comparison cache
//! and the restore coordinator together. Every operation takes the caller's
//! tenant explicitly; version ids are always resolved through the store (and
//! so tenant-checked) before any cached or computed data is returned.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::ComparisonCache;
use crate::config::AppConfig;
use crate::conflict::{find_conflict_blocks, ConflictRegion, MergeEngine, MergeOptions, MergeResult};
use crate::diff::{DiffEngine, DiffResult};
use crate::errors::VersionError;
use crate::models::{ContentVersion, NewVersion, RestoreRecord, TenantId};
use crate::restore::{RestoreCoordinator, RestoreOutcome};
use crate::store::VersionStore;

/// Version control operations for one host application.
#[derive(Clone)]
pub struct VersionControl {
    store: Arc<dyn VersionStore>,
    cache: Arc<ComparisonCache>,
    merger: MergeEngine,
    restorer: RestoreCoordinator,
}

impl VersionControl {
    pub fn new(store: Arc<dyn VersionStore>, cache: Arc<ComparisonCache>, merger: MergeEngine) -> Self {
        let restorer = RestoreCoordinator::new(Arc::clone(&store));
        Self {
            store,
            cache,
            merger,
            restorer,
        }
    }

    /// Build with engines, limits and cache capacity taken from `config`.
    pub fn from_config(config: &AppConfig, store: Arc<dyn VersionStore>) -> Self {
        Self::new(
            store,
            Arc::new(ComparisonCache::from_config(&config.cache)),
            MergeEngine::from_config(config),
        )
    }

    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    pub fn cache(&self) -> &ComparisonCache {
        &self.cache
    }

    pub fn diff_engine(&self) -> &DiffEngine {
        self.merger.detector().engine()
    }

    pub fn merge_engine(&self) -> &MergeEngine {
        &self.merger
    }

    // ----- Reads -----

    pub fn get_version(&self, tenant: TenantId, version_id: i64) -> Result<ContentVersion, VersionError> {
        self.store.get_version(tenant, version_id)
    }

    pub fn list_versions(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<ContentVersion>, VersionError> {
        self.store.list_versions(tenant, content_id)
    }

    pub fn get_current(&self, tenant: TenantId, content_id: i64) -> Result<ContentVersion, VersionError> {
        self.store.get_current(tenant, content_id)
    }

    // ----- Writes -----

    /// Save `body` as the new head of `content_id`.
    ///
    /// Bodies still containing conflict marker blocks are rejected with
    /// [`VersionError::InvalidMergeState`].
    pub fn commit(
        &self,
        tenant: TenantId,
        content_id: i64,
        body: impl Into<String>,
        author_id: i64,
    ) -> Result<ContentVersion, VersionError> {
        self.commit_version(tenant, NewVersion::new(content_id, body, author_id))
    }

    /// [`commit`](Self::commit) with full control over the new version's
    /// fields.
    pub fn commit_version(&self, tenant: TenantId, new: NewVersion) -> Result<ContentVersion, VersionError> {
        let blocks = find_conflict_blocks(&new.body);
        if !blocks.is_empty() {
            warn!(
                tenant_id = tenant.0,
                content_id = new.content_id,
                conflicts = blocks.len(),
                "rejected commit with unresolved conflict markers"
            );
            return Err(VersionError::InvalidMergeState {
                conflicts: blocks.len(),
            });
        }
        self.store.create_version(tenant, new)
    }

    // ----- Comparison -----

    /// Diff of version `from_id` against `to_id`, served from the cache when
    /// possible.
    pub fn compare(
        &self,
        tenant: TenantId,
        from_id: i64,
        to_id: i64,
    ) -> Result<Arc<DiffResult>, VersionError> {
        let from = self.store.get_version(tenant, from_id)?;
        let to = self.store.get_version(tenant, to_id)?;
        self.compare_loaded(&from, &to)
    }

    fn compare_loaded(
        &self,
        from: &ContentVersion,
        to: &ContentVersion,
    ) -> Result<Arc<DiffResult>, VersionError> {
        if let Some(hit) = self.cache.get(from.id, to.id) {
            return Ok(hit);
        }
        let result = self.diff_engine().diff_versions(from, to)?;
        Ok(self.cache.put(from.id, to.id, result))
    }

    // ----- Merge -----

    /// Conflicts between two versions, three-way when `base_id` is given.
    pub fn detect_conflicts(
        &self,
        tenant: TenantId,
        ours_id: i64,
        theirs_id: i64,
        base_id: Option<i64>,
    ) -> Result<Vec<ConflictRegion>, VersionError> {
        let ours = self.store.get_version(tenant, ours_id)?;
        let theirs = self.store.get_version(tenant, theirs_id)?;
        let detector = self.merger.detector();
        match base_id {
            Some(base_id) => {
                let base = self.store.get_version(tenant, base_id)?;
                detector.detect(&base.body, &ours.body, &theirs.body)
            }
            None => detector.detect_two_way(&ours.body, &theirs.body),
        }
    }

    /// Merge two versions. With `base_id` the merge is three-way; without it
    /// the merge falls back to the two-way form over the cached
    /// `diff(ours, theirs)`, marking every modified region.
    pub fn merge_versions(
        &self,
        tenant: TenantId,
        ours_id: i64,
        theirs_id: i64,
        base_id: Option<i64>,
        options: MergeOptions,
    ) -> Result<MergeResult, VersionError> {
        let ours = self.store.get_version(tenant, ours_id)?;
        let theirs = self.store.get_version(tenant, theirs_id)?;

        let result = match base_id {
            Some(base_id) => {
                let base = self.store.get_version(tenant, base_id)?;
                self.merger
                    .merge_three_way(&base.body, &ours.body, &theirs.body, options)?
            }
            None => {
                let diff = self.compare_loaded(&ours, &theirs)?;
                self.merger.merge(&ours.body, &theirs.body, &diff, options)?
            }
        };

        info!(
            tenant_id = tenant.0,
            ours_id,
            theirs_id,
            ?base_id,
            conflicts = result.conflicts.len(),
            "merged versions"
        );
        Ok(result)
    }

    // ----- Restore -----

    pub fn restore(
        &self,
        tenant: TenantId,
        version_id: i64,
        restored_by: i64,
        notes: Option<String>,
    ) -> Result<RestoreOutcome, VersionError> {
        self.restorer.restore(tenant, version_id, restored_by, notes)
    }

    pub fn list_restores(
        &self,
        tenant: TenantId,
        content_id: i64,
    ) -> Result<Vec<RestoreRecord>, VersionError> {
        self.restorer.history(tenant, content_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{ConflictResolver, Resolution};
    use crate::diff::{Change, ChangeKind};
    use crate::store::MemoryVersionStore;

    fn control() -> VersionControl {
        VersionControl::from_config(&AppConfig::default(), Arc::new(MemoryVersionStore::new()))
    }

    #[test]
    fn test_example_scenario() {
        let vc = control();
        let tenant = TenantId(7);
        let v1 = vc.commit(tenant, 42, "Hello world", 1).unwrap();
        let v2 = vc.commit(tenant, 42, "Hello there world", 1).unwrap();

        let diff = vc.compare(tenant, v1.id, v2.id).unwrap();
        assert_eq!(
            diff.changes.iter().map(Change::kind).collect::<Vec<_>>(),
            vec![ChangeKind::Modify]
        );
        assert_eq!(diff.apply(&v1.body).unwrap(), v2.body);

        let restored = vc.restore(tenant, v1.id, 1, None).unwrap();
        assert_eq!(restored.version.version_number, 3);
        assert_eq!(restored.version.body, "Hello world");
        assert!(restored.version.is_current);
        assert_eq!(restored.record.version_id, v1.id);
        assert_eq!(restored.record.new_version_id, restored.version.id);
    }

    #[test]
    fn test_compare_uses_cache() {
        let vc = control();
        let tenant = TenantId(1);
        let a = vc.commit(tenant, 1, "a\n", 1).unwrap();
        let b = vc.commit(tenant, 1, "b\n", 1).unwrap();

        let first = vc.compare(tenant, a.id, b.id).unwrap();
        let second = vc.compare(tenant, a.id, b.id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(vc.cache().stats().hits, 1);

        let reverse = vc.compare(tenant, b.id, a.id).unwrap();
        assert_eq!(*reverse, first.invert());
    }

    #[test]
    fn test_cached_comparison_is_still_tenant_checked() {
        let vc = control();
        let a = vc.commit(TenantId(1), 1, "a\n", 1).unwrap();
        let b = vc.commit(TenantId(1), 1, "b\n", 1).unwrap();
        vc.compare(TenantId(1), a.id, b.id).unwrap();

        assert!(matches!(
            vc.compare(TenantId(2), a.id, b.id),
            Err(VersionError::TenantMismatch { .. })
        ));
    }

    #[test]
    fn test_conflicted_merge_cannot_be_committed() {
        let vc = control();
        let tenant = TenantId(3);
        let base = vc.commit(tenant, 8, "intro\nbody\n", 1).unwrap();
        let ours = vc.commit(tenant, 8, "intro\nours\n", 1).unwrap();
        let theirs = vc.commit(tenant, 8, "intro\ntheirs\n", 2).unwrap();

        let merged = vc
            .merge_versions(tenant, ours.id, theirs.id, Some(base.id), MergeOptions::default())
            .unwrap();
        assert_eq!(merged.conflicts.len(), 1);
        assert!(matches!(
            vc.commit(tenant, 8, merged.merged_body.clone(), 1),
            Err(VersionError::InvalidMergeState { conflicts: 1 })
        ));

        let resolved = ConflictResolver::resolve_all(&merged.merged_body, &Resolution::Theirs).unwrap();
        let committed = vc.commit(tenant, 8, resolved, 1).unwrap();
        assert_eq!(committed.body, "intro\ntheirs\n");
    }

    #[test]
    fn test_two_way_merge_without_base() {
        let vc = control();
        let tenant = TenantId(3);
        let a = vc.commit(tenant, 8, "keep\nold\n", 1).unwrap();
        let b = vc.commit(tenant, 8, "keep\nnew\nadded\n", 1).unwrap();

        let conflicts = vc.detect_conflicts(tenant, a.id, b.id, None).unwrap();
        let merged = vc
            .merge_versions(tenant, a.id, b.id, None, MergeOptions::default())
            .unwrap();
        assert_eq!(merged.conflicts, conflicts);
        assert_eq!(merged.conflict_markers.len(), conflicts.len());
    }

    #[test]
    fn test_too_large_bodies_are_rejected_for_comparison() {
        let mut config = AppConfig::default();
        config.limits.max_body_bytes = 8;
        let vc = VersionControl::from_config(&config, Arc::new(MemoryVersionStore::new()));
        let tenant = TenantId(1);
        let a = vc.commit(tenant, 1, "short", 1).unwrap();
        let b = vc.commit(tenant, 1, "much longer body", 1).unwrap();
        assert!(matches!(
            vc.compare(tenant, a.id, b.id),
            Err(VersionError::TooLarge { limit: 8, .. })
        ));
    }
}
