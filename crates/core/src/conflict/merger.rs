//! Merge engine.
//!
//! [`MergeEngine::merge`] consumes a precomputed `diff(a, b)` and merges the
//! two versions without a common ancestor: unchanged lines are kept, pure
//! insertions and deletions follow [`MergeOptions`], and every `modify`
//! region becomes a marked conflict. [`MergeEngine::merge_three_way`] uses the
//! detector's hunk analysis so edits that do not overlap combine cleanly.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::detector::{ConflictDetector, ConflictRegion, Hunk, Side};
use super::markers::{marker_width, ConflictMarker, MarkedBody, MarkerLabels};
use crate::config::AppConfig;
use crate::diff::{split_lines, Change, DiffEngine, DiffResult};
use crate::errors::VersionError;

/// How one-sided additions and deletions are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Carry lines present only in version B into the result.
    #[serde(default = "default_true")]
    pub include_additions: bool,
    /// Keep lines that the other side deleted instead of dropping them.
    #[serde(default)]
    pub exclude_deletions: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            include_additions: true,
            exclude_deletions: false,
        }
    }
}

/// The result of a merge. `merged_body` contains conflict markers for every
/// entry in `conflicts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub merged_body: String,
    pub conflicts: Vec<ConflictRegion>,
    /// Locations of the marker blocks within `merged_body`, in order.
    pub conflict_markers: Vec<ConflictMarker>,
}

impl MergeResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Merges version bodies, writing conflict markers with configured labels.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    detector: ConflictDetector,
    labels: MarkerLabels,
}

impl MergeEngine {
    pub fn new(detector: ConflictDetector, labels: MarkerLabels) -> Self {
        Self { detector, labels }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            ConflictDetector::new(DiffEngine::from_config(&config.limits)),
            MarkerLabels::from(&config.merge),
        )
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    pub fn labels(&self) -> &MarkerLabels {
        &self.labels
    }

    /// Two-way merge of `ours` and `theirs` using `diff`, which must be
    /// `diff(ours, theirs)`.
    pub fn merge(
        &self,
        ours: &str,
        theirs: &str,
        diff: &DiffResult,
        options: MergeOptions,
    ) -> Result<MergeResult, VersionError> {
        let engine = self.detector.engine();
        engine.check_size(ours)?;
        engine.check_size(theirs)?;

        let rebuilt = diff.apply(ours)?;
        if rebuilt != theirs {
            return Err(VersionError::PatchMismatch {
                line: first_difference(&rebuilt, theirs),
            });
        }

        info!(
            changes = diff.changes.len(),
            include_additions = options.include_additions,
            exclude_deletions = options.exclude_deletions,
            "performing two-way merge"
        );

        let mut body = MarkedBody::new(&self.labels, marker_width(&[ours, theirs]));
        let mut conflicts = Vec::new();

        for change in &diff.changes {
            match change {
                Change::Unchanged { lines, .. } => body.push_lines(lines),
                Change::Insert { new_content, .. } => {
                    if options.include_additions {
                        body.push_lines(new_content);
                    }
                }
                Change::Delete { old_content, .. } => {
                    if options.exclude_deletions {
                        body.push_lines(old_content);
                    }
                }
                Change::Modify { .. } => {
                    if let Some(region) = ConflictRegion::from_modify(change) {
                        body.push_conflict(&region);
                        conflicts.push(region);
                    }
                }
            }
        }

        Ok(self.finish(body, conflicts))
    }

    /// Three-way merge of `ours` and `theirs` against their common ancestor.
    ///
    /// Non-overlapping edits combine. Options apply to clean one-sided
    /// hunks: a pure insertion from `theirs` is dropped unless
    /// `include_additions`, and a pure deletion from either side is undone
    /// when `exclude_deletions`.
    pub fn merge_three_way(
        &self,
        base: &str,
        ours: &str,
        theirs: &str,
        options: MergeOptions,
    ) -> Result<MergeResult, VersionError> {
        info!("performing three-way merge");
        let hunks = self.detector.analyze(base, ours, theirs)?;

        let mut body = MarkedBody::new(&self.labels, marker_width(&[base, ours, theirs]));
        let mut conflicts = Vec::new();

        for hunk in hunks {
            match hunk {
                Hunk::Stable(lines) => body.push_lines(&lines),
                Hunk::Resolved { base, lines, side } => {
                    if lines.is_empty() && !base.is_empty() && options.exclude_deletions {
                        debug!(%side, lines = base.len(), "keeping deleted lines");
                        body.push_lines(&base);
                    } else if base.is_empty() && side == Side::Theirs && !options.include_additions {
                        debug!(lines = lines.len(), "dropping addition from theirs");
                    } else {
                        body.push_lines(&lines);
                    }
                }
                Hunk::Conflict(region) => {
                    body.push_conflict(&region);
                    conflicts.push(region);
                }
            }
        }

        Ok(self.finish(body, conflicts))
    }

    fn finish(&self, body: MarkedBody<'_>, conflicts: Vec<ConflictRegion>) -> MergeResult {
        let (merged_body, conflict_markers) = body.finish();
        if conflicts.is_empty() {
            debug!("merge completed cleanly");
        } else {
            info!(conflicts = conflicts.len(), "merge produced conflicts");
        }
        MergeResult {
            merged_body,
            conflicts,
            conflict_markers,
        }
    }
}

/// 1-indexed number of the first line where `a` and `b` differ.
fn first_difference(a: &str, b: &str) -> usize {
    let (a, b) = (split_lines(a), split_lines(b));
    a.iter()
        .zip(&b)
        .take_while(|(x, y)| x == y)
        .count()
        + 1
}
