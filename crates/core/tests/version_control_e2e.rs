//! End-to-end tests for the `VersionControl` facade.
//!
//! These tests exercise the real stack with:
//! - On-disk SQLite databases in temporary directories
//! - The SQLite version store and its audit log
//! - The diff, merge and restore engines behind the facade
//!
//! No network I/O and no external tools are required.

use std::sync::Arc;

use tempfile::TempDir;

use contentvc_core::config::AppConfig;
use contentvc_core::conflict::{
    contains_conflict_markers, find_conflict_blocks, ConflictResolver, MergeEngine, MergeOptions,
    Resolution,
};
use contentvc_core::db::Database;
use contentvc_core::diff::DiffEngine;
use contentvc_core::errors::VersionError;
use contentvc_core::models::TenantId;
use contentvc_core::store::SqliteVersionStore;
use contentvc_core::VersionControl;

// ===========================================================================
// Helpers
// ===========================================================================

struct Harness {
    _dir: TempDir,
    db: Arc<Database>,
    vc: VersionControl,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage.database_path = dir.path().join("contentvc.db");

    let db = Arc::new(Database::from_config(&config.storage).unwrap());
    let store = Arc::new(SqliteVersionStore::new(Arc::clone(&db)));
    let vc = VersionControl::from_config(&config, store);
    Harness { _dir: dir, db, vc }
}

/// Deterministic pseudo-random generator for body fixtures.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }

    fn body(&mut self) -> String {
        const WORDS: [&str; 6] = ["alpha", "beta", "gamma", "delta", "  ", ""];
        let lines = self.next(15);
        let mut body = String::new();
        for _ in 0..lines {
            body.push_str(WORDS[self.next(WORDS.len() as u64) as usize]);
            if self.next(10) > 0 {
                body.push('\n');
            }
        }
        body
    }

    /// Markdown-like body that also uses lines shaped like conflict markers.
    fn marked_body(&mut self) -> String {
        const LINES: [&str; 9] = [
            "Title",
            "=======",
            "========",
            "<<<<<<< x",
            ">>>>>>> y",
            "||||||| z",
            "======= (no newline)",
            "text",
            "",
        ];
        let lines = self.next(12);
        let mut body = String::new();
        for _ in 0..lines {
            body.push_str(LINES[self.next(LINES.len() as u64) as usize]);
            body.push('\n');
        }
        if self.next(4) == 0 {
            body.push_str("tail");
        }
        body
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn version_numbers_are_gapless_under_parallel_writers() {
    let h = harness();
    let tenant = TenantId(7);

    let handles: Vec<_> = (0..12)
        .map(|i| {
            let vc = h.vc.clone();
            std::thread::spawn(move || {
                // A retryable race is the caller's to retry.
                loop {
                    match vc.commit(tenant, 42, format!("body {i}\n"), i) {
                        Ok(version) => return version.version_number,
                        Err(e) if e.is_retryable() => continue,
                        Err(e) => panic!("commit failed: {e}"),
                    }
                }
            })
        })
        .collect();

    let mut numbers: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=12).collect::<Vec<_>>());

    let versions = h.vc.list_versions(tenant, 42).unwrap();
    assert_eq!(versions.len(), 12);
    assert_eq!(versions.iter().filter(|v| v.is_current).count(), 1);
    assert_eq!(versions[0].version_number, 12);
    assert!(versions[0].is_current);
}

#[test]
fn tenants_cannot_see_each_other() {
    let h = harness();
    let (t1, t2) = (TenantId(1), TenantId(2));
    let v1 = h.vc.commit(t1, 100, "tenant one\n", 1).unwrap();
    let v2 = h.vc.commit(t2, 200, "tenant two\n", 2).unwrap();

    assert!(matches!(
        h.vc.get_version(t1, v2.id),
        Err(VersionError::TenantMismatch { .. })
    ));
    assert!(matches!(
        h.vc.get_version(t2, v1.id),
        Err(VersionError::TenantMismatch { .. })
    ));
    assert!(matches!(
        h.vc.compare(t1, v1.id, v2.id),
        Err(VersionError::TenantMismatch { .. })
    ));
    assert!(matches!(
        h.vc.restore(t2, v1.id, 2, None),
        Err(VersionError::TenantMismatch { .. })
    ));
    assert!(matches!(
        h.vc.commit(t2, 100, "hijack\n", 2),
        Err(VersionError::TenantMismatch { .. })
    ));

    // Every denial is audited against the offending tenant.
    let audit = h.db.list_audit_log(t1, 50).unwrap();
    assert!(audit.iter().any(|e| e.action == "tenant_mismatch"));
    let audit = h.db.list_audit_log(t2, 50).unwrap();
    assert_eq!(
        audit.iter().filter(|e| e.action == "tenant_mismatch").count(),
        3
    );
}

#[test]
fn restore_is_traceable() {
    let h = harness();
    let tenant = TenantId(7);
    let v1 = h.vc.commit(tenant, 42, "Hello world", 1).unwrap();
    h.vc.commit(tenant, 42, "Hello there world", 1).unwrap();

    let first = h.vc.restore(tenant, v1.id, 5, Some("rollback".into())).unwrap();
    let second = h.vc.restore(tenant, v1.id, 5, None).unwrap();

    for outcome in [&first, &second] {
        assert_eq!(outcome.version.body, v1.body);
        assert_eq!(outcome.version.body_hash, v1.body_hash);
        assert_eq!(outcome.version.restored_from, Some(v1.id));
        assert_eq!(outcome.record.version_id, v1.id);
        assert_eq!(outcome.record.new_version_id, outcome.version.id);
    }
    assert_eq!(first.version.version_number, 3);
    assert_eq!(second.version.version_number, 4);

    let records = h.vc.list_restores(tenant, 42).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, second.record.id);
    assert_eq!(records[1].notes.as_deref(), Some("rollback"));

    let current = h.vc.get_current(tenant, 42).unwrap();
    assert_eq!(current.id, second.version.id);

    let audit = h.db.list_audit_log(tenant, 50).unwrap();
    assert_eq!(
        audit.iter().filter(|e| e.action == "version_restored").count(),
        2
    );
}

#[test]
fn conflicted_merges_must_be_resolved_before_commit() {
    let h = harness();
    let tenant = TenantId(3);
    let base = h
        .vc
        .commit(tenant, 9, "# Title\n\nfirst paragraph\n\nsecond paragraph\n", 1)
        .unwrap();
    let ours = h
        .vc
        .commit(tenant, 9, "# Title\n\nfirst paragraph, edited\n\nsecond paragraph\n", 1)
        .unwrap();
    let theirs = h
        .vc
        .commit(tenant, 9, "# Title\n\nfirst paragraph, rewritten\n\nsecond paragraph!\n", 2)
        .unwrap();

    let conflicts = h
        .vc
        .detect_conflicts(tenant, ours.id, theirs.id, Some(base.id))
        .unwrap();
    assert_eq!(conflicts.len(), 1);

    let merged = h
        .vc
        .merge_versions(tenant, ours.id, theirs.id, Some(base.id), MergeOptions::default())
        .unwrap();
    assert_eq!(merged.conflicts, conflicts);
    assert_eq!(merged.conflict_markers.len(), conflicts.len());
    assert!(contains_conflict_markers(&merged.merged_body));
    // The non-overlapping edit from theirs merged cleanly.
    assert!(merged.merged_body.ends_with("second paragraph!\n"));

    assert!(matches!(
        h.vc.commit(tenant, 9, merged.merged_body.clone(), 1),
        Err(VersionError::InvalidMergeState { conflicts: 1 })
    ));

    let resolved = ConflictResolver::resolve_all(&merged.merged_body, &Resolution::Ours).unwrap();
    let committed = h.vc.commit(tenant, 9, resolved, 1).unwrap();
    assert_eq!(
        committed.body,
        "# Title\n\nfirst paragraph, edited\n\nsecond paragraph!\n"
    );
}

#[test]
fn markdown_underlines_are_committable() {
    let h = harness();
    let body = "Heading\n=======\n\ntext\n";
    let version = h.vc.commit(TenantId(1), 1, body, 1).unwrap();
    assert_eq!(version.body, body);
}

#[test]
fn diffs_round_trip_and_mirror_over_generated_bodies() {
    let engine = DiffEngine::default();
    let mut rng = Lcg(0x9e37_79b9_7f4a_7c15);

    for _ in 0..500 {
        let a = rng.body();
        let b = rng.body();
        let forward = engine.diff(&a, &b).unwrap();
        let backward = engine.diff(&b, &a).unwrap();

        assert_eq!(forward.apply(&a).unwrap(), b, "a={a:?} b={b:?}");
        assert_eq!(backward.apply(&b).unwrap(), a, "a={a:?} b={b:?}");
        assert_eq!(forward.invert().apply(&b).unwrap(), a, "a={a:?} b={b:?}");

        let (f, r) = (forward.summary(), backward.summary());
        assert_eq!(f.inserted_lines, r.deleted_lines);
        assert_eq!(f.deleted_lines, r.inserted_lines);
        assert_eq!(f.unchanged_lines, r.unchanged_lines);
        assert_eq!(forward.is_identical(), a == b);
    }
}

#[test]
fn resolving_one_side_reproduces_it_over_generated_bodies() {
    let engine = DiffEngine::default();
    let merger = MergeEngine::default();
    let mut rng = Lcg(0x2545_f491_4f6c_dd1d);
    // Conflicts aside, these keep exactly one side's lines.
    let keep_ours = MergeOptions {
        include_additions: false,
        exclude_deletions: true,
    };
    let keep_theirs = MergeOptions {
        include_additions: true,
        exclude_deletions: false,
    };

    for _ in 0..500 {
        let ours = rng.marked_body();
        let theirs = rng.marked_body();
        let diff = engine.diff(&ours, &theirs).unwrap();

        let merged = merger.merge(&ours, &theirs, &diff, keep_ours).unwrap();
        let body = &merged.merged_body;
        assert_eq!(find_conflict_blocks(body).len(), merged.conflicts.len(), "{body:?}");
        let resolved = ConflictResolver::resolve_all(body, &Resolution::Ours).unwrap();
        assert_eq!(resolved, ours, "merged={body:?}");

        let merged = merger.merge(&ours, &theirs, &diff, keep_theirs).unwrap();
        let body = &merged.merged_body;
        assert_eq!(find_conflict_blocks(body).len(), merged.conflicts.len(), "{body:?}");
        let resolved = ConflictResolver::resolve_all(body, &Resolution::Theirs).unwrap();
        assert_eq!(resolved, theirs, "merged={body:?}");
    }
}

#[test]
fn stored_comparisons_are_cached_per_direction() {
    let h = harness();
    let tenant = TenantId(4);
    let a = h.vc.commit(tenant, 1, "one\ntwo\n", 1).unwrap();
    let b = h.vc.commit(tenant, 1, "one\n2\n", 1).unwrap();

    let forward = h.vc.compare(tenant, a.id, b.id).unwrap();
    let backward = h.vc.compare(tenant, b.id, a.id).unwrap();
    h.vc.compare(tenant, a.id, b.id).unwrap();

    assert_eq!(forward.from_version_id, Some(a.id));
    assert_eq!(backward.from_version_id, Some(b.id));
    let stats = h.vc.cache().stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 2, 2));

    // Same body, different versions: no line comparison needed.
    let c = h.vc.commit(tenant, 1, "one\n2\n", 1).unwrap();
    assert!(h.vc.compare(tenant, b.id, c.id).unwrap().is_identical());
}
