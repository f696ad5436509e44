//! Line-based diffing of version bodies.
//!
//! Bodies are split on `\n` with the terminator kept on each line, so a line
//! that only gained trailing whitespace or lost its final newline compares
//! unequal and shows up as a `modify`. Adjacent deletions and insertions
//! between the same pair of unchanged runs are coalesced into one
//! [`Change::Modify`].
//!
//! The edit script comes from `similar`'s Myers implementation run under a
//! deadline. A search that runs out of time, or a script that edits more
//! lines than the configured cap, is replaced by one whole-body record.

use std::fmt;
use std::ops::Range;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffOp, TextDiff};
use tracing::{debug, warn};

use crate::config::LimitsConfig;
use crate::errors::VersionError;
use crate::models::ContentVersion;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A 1-indexed, inclusive range of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Range covering `len` lines starting at 0-based index `index`.
    /// `len` must be non-zero.
    pub(crate) fn at(index: usize, len: usize) -> Self {
        Self {
            start: index + 1,
            end: index + len,
        }
    }

    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Zero-based half-open equivalent.
    pub fn to_span(self) -> Range<usize> {
        self.start - 1..self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Kind of a change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Unchanged,
    Insert,
    Delete,
    Modify,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Insert => write!(f, "insert"),
            Self::Delete => write!(f, "delete"),
            Self::Modify => write!(f, "modify"),
        }
    }
}

/// One region of a diff. Line contents keep their `\n` terminators.
///
/// Insertions and deletions have no lines on one side; they carry the
/// number of lines that precede them on that side instead of a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    Unchanged {
        lines: Vec<String>,
        old_range: LineRange,
        new_range: LineRange,
    },
    Insert {
        new_content: Vec<String>,
        new_range: LineRange,
        after_old_line: usize,
    },
    Delete {
        old_content: Vec<String>,
        old_range: LineRange,
        after_new_line: usize,
    },
    Modify {
        old_content: Vec<String>,
        new_content: Vec<String>,
        old_range: LineRange,
        new_range: LineRange,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Unchanged { .. } => ChangeKind::Unchanged,
            Self::Insert { .. } => ChangeKind::Insert,
            Self::Delete { .. } => ChangeKind::Delete,
            Self::Modify { .. } => ChangeKind::Modify,
        }
    }

    /// Lines this region occupies in the old body.
    pub fn old_lines(&self) -> &[String] {
        match self {
            Self::Unchanged { lines, .. } => lines,
            Self::Insert { .. } => &[],
            Self::Delete { old_content, .. } | Self::Modify { old_content, .. } => old_content,
        }
    }

    /// Lines this region occupies in the new body.
    pub fn new_lines(&self) -> &[String] {
        match self {
            Self::Unchanged { lines, .. } => lines,
            Self::Delete { .. } => &[],
            Self::Insert { new_content, .. } | Self::Modify { new_content, .. } => new_content,
        }
    }

    /// Zero-based half-open line span in the old body. Empty for insertions.
    pub fn old_span(&self) -> Range<usize> {
        match self {
            Self::Unchanged { old_range, .. }
            | Self::Delete { old_range, .. }
            | Self::Modify { old_range, .. } => old_range.to_span(),
            Self::Insert { after_old_line, .. } => *after_old_line..*after_old_line,
        }
    }

    /// Zero-based half-open line span in the new body. Empty for deletions.
    pub fn new_span(&self) -> Range<usize> {
        match self {
            Self::Unchanged { new_range, .. }
            | Self::Insert { new_range, .. }
            | Self::Modify { new_range, .. } => new_range.to_span(),
            Self::Delete { after_new_line, .. } => *after_new_line..*after_new_line,
        }
    }

    /// The same region seen from the other side.
    pub fn invert(&self) -> Change {
        match self.clone() {
            Self::Unchanged {
                lines,
                old_range,
                new_range,
            } => Self::Unchanged {
                lines,
                old_range: new_range,
                new_range: old_range,
            },
            Self::Insert {
                new_content,
                new_range,
                after_old_line,
            } => Self::Delete {
                old_content: new_content,
                old_range: new_range,
                after_new_line: after_old_line,
            },
            Self::Delete {
                old_content,
                old_range,
                after_new_line,
            } => Self::Insert {
                new_content: old_content,
                new_range: old_range,
                after_old_line: after_new_line,
            },
            Self::Modify {
                old_content,
                new_content,
                old_range,
                new_range,
            } => Self::Modify {
                old_content: new_content,
                new_content: old_content,
                old_range: new_range,
                new_range: old_range,
            },
        }
    }
}

/// Line counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub unchanged_lines: usize,
    pub inserted_lines: usize,
    pub deleted_lines: usize,
    /// Number of non-unchanged regions.
    pub changed_regions: usize,
}

/// Ordered comparison of two bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub from_version_id: Option<i64>,
    pub to_version_id: Option<i64>,
    pub changes: Vec<Change>,
}

impl DiffResult {
    /// Attach the ids of the versions that were compared.
    pub fn between(mut self, from_version_id: i64, to_version_id: i64) -> Self {
        self.from_version_id = Some(from_version_id);
        self.to_version_id = Some(to_version_id);
        self
    }

    pub fn is_identical(&self) -> bool {
        self.changes
            .iter()
            .all(|c| matches!(c, Change::Unchanged { .. }))
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for change in &self.changes {
            match change {
                Change::Unchanged { lines, .. } => summary.unchanged_lines += lines.len(),
                other => {
                    summary.changed_regions += 1;
                    summary.deleted_lines += other.old_lines().len();
                    summary.inserted_lines += other.new_lines().len();
                }
            }
        }
        summary
    }

    /// Mirror diff: `diff(a, b).invert()` describes `diff(b, a)`.
    pub fn invert(&self) -> DiffResult {
        DiffResult {
            from_version_id: self.to_version_id,
            to_version_id: self.from_version_id,
            changes: self.changes.iter().map(Change::invert).collect(),
        }
    }

    /// Apply this diff to `base`, which must be the body it was computed
    /// from. Returns the other body.
    pub fn apply(&self, base: &str) -> Result<String, VersionError> {
        let lines = split_lines(base);
        let mut cursor = 0;
        let mut out = String::with_capacity(base.len());

        for change in &self.changes {
            let expected = change.old_lines();
            for (offset, line) in expected.iter().enumerate() {
                if lines.get(cursor + offset).copied() != Some(line.as_str()) {
                    return Err(VersionError::PatchMismatch {
                        line: cursor + offset + 1,
                    });
                }
            }
            cursor += expected.len();
            for line in change.new_lines() {
                out.push_str(line);
            }
        }

        if cursor != lines.len() {
            return Err(VersionError::PatchMismatch { line: cursor + 1 });
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Split a body into lines, each keeping its `\n` terminator.
pub fn split_lines(body: &str) -> Vec<&str> {
    body.split_inclusive('\n').collect()
}

/// Computes [`DiffResult`]s, rejecting bodies above a size bound and
/// bounding the time spent on any one comparison.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    max_body_bytes: usize,
    timeout: Duration,
    max_edit_lines: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::default())
    }
}

impl DiffEngine {
    /// Engine with the given body limit and default cost bounds.
    pub fn new(max_body_bytes: usize) -> Self {
        let defaults = LimitsConfig::default();
        Self {
            max_body_bytes,
            timeout: Duration::from_millis(defaults.diff_timeout_ms),
            max_edit_lines: defaults.max_edit_lines,
        }
    }

    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self::new(limits.max_body_bytes)
            .with_timeout(Duration::from_millis(limits.diff_timeout_ms))
            .with_max_edit_lines(limits.max_edit_lines)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_edit_lines(mut self, max_edit_lines: usize) -> Self {
        self.max_edit_lines = max_edit_lines;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Fail with [`VersionError::TooLarge`] when `body` exceeds the bound.
    pub fn check_size(&self, body: &str) -> Result<(), VersionError> {
        if body.len() > self.max_body_bytes {
            return Err(VersionError::TooLarge {
                size: body.len(),
                limit: self.max_body_bytes,
            });
        }
        Ok(())
    }

    /// Diff two bodies.
    pub fn diff(&self, old: &str, new: &str) -> Result<DiffResult, VersionError> {
        self.check_size(old)?;
        self.check_size(new)?;

        let old_lines = split_lines(old);
        let new_lines = split_lines(new);

        let deadline = Instant::now() + self.timeout;
        let mut ops = similar::capture_diff_slices_deadline(
            Algorithm::Myers,
            &old_lines,
            &new_lines,
            Some(deadline),
        );

        // Identical line sequences have nothing to bound.
        let edited = edited_lines(&ops);
        if edited > 0 && Instant::now() >= deadline {
            warn!(
                old_lines = old_lines.len(),
                new_lines = new_lines.len(),
                timeout_ms = self.timeout.as_millis() as u64,
                "diff deadline reached, reporting whole-body modify"
            );
            ops = whole_body(old_lines.len(), new_lines.len());
        } else if edited > self.max_edit_lines {
            warn!(
                edited,
                max_edit_lines = self.max_edit_lines,
                "diff edits too many lines, reporting whole-body modify"
            );
            ops = whole_body(old_lines.len(), new_lines.len());
        }

        let changes = build_changes(&old_lines, &new_lines, &ops);
        debug!(
            old_lines = old_lines.len(),
            new_lines = new_lines.len(),
            regions = changes.len(),
            "computed diff"
        );
        Ok(DiffResult {
            from_version_id: None,
            to_version_id: None,
            changes,
        })
    }

    /// Diff two stored versions. Versions with equal body hashes skip the
    /// line comparison.
    pub fn diff_versions(
        &self,
        from: &ContentVersion,
        to: &ContentVersion,
    ) -> Result<DiffResult, VersionError> {
        let result = if from.body_hash == to.body_hash && from.body == to.body {
            self.check_size(&from.body)?;
            let lines = split_lines(&from.body);
            let changes = if lines.is_empty() {
                Vec::new()
            } else {
                let range = LineRange::at(0, lines.len());
                vec![Change::Unchanged {
                    lines: lines.into_iter().map(str::to_owned).collect(),
                    old_range: range,
                    new_range: range,
                }]
            };
            debug!(from = from.id, to = to.id, "bodies identical, skipping diff");
            DiffResult {
                from_version_id: None,
                to_version_id: None,
                changes,
            }
        } else {
            self.diff(&from.body, &to.body)?
        };
        Ok(result.between(from.id, to.id))
    }

    /// Render a unified patch between two bodies, under the same deadline
    /// as [`diff`](Self::diff).
    pub fn unified(&self, old: &str, new: &str) -> Result<String, VersionError> {
        self.check_size(old)?;
        self.check_size(new)?;
        let diff = TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .timeout(self.timeout)
            .diff_lines(old, new);
        Ok(diff
            .unified_diff()
            .context_radius(3)
            .header("original", "modified")
            .to_string())
    }
}

/// Deleted plus inserted lines in an edit script.
fn edited_lines(ops: &[DiffOp]) -> usize {
    ops.iter()
        .map(|op| match *op {
            DiffOp::Equal { .. } => 0,
            DiffOp::Delete { old_len, .. } => old_len,
            DiffOp::Insert { new_len, .. } => new_len,
            DiffOp::Replace {
                old_len, new_len, ..
            } => old_len + new_len,
        })
        .sum()
}

/// Script that replaces every old line with every new line.
fn whole_body(old_len: usize, new_len: usize) -> Vec<DiffOp> {
    let mut ops = Vec::with_capacity(2);
    if old_len > 0 {
        ops.push(DiffOp::Delete {
            old_index: 0,
            old_len,
            new_index: 0,
        });
    }
    if new_len > 0 {
        ops.push(DiffOp::Insert {
            old_index: old_len,
            new_index: 0,
            new_len,
        });
    }
    ops
}

/// Group an edit script into change records. Every run of deletions and
/// insertions between two equal runs becomes one record.
fn build_changes(old: &[&str], new: &[&str], ops: &[DiffOp]) -> Vec<Change> {
    let to_owned = |lines: &[&str]| lines.iter().map(|l| (*l).to_owned()).collect::<Vec<_>>();
    let mut changes = Vec::new();
    // Pending edit region: start indices and lengths on both sides.
    let (mut old_at, mut new_at) = (0usize, 0usize);
    let (mut deleted, mut inserted) = (0usize, 0usize);

    let flush = |changes: &mut Vec<Change>, old_at: usize, new_at: usize, deleted: usize, inserted: usize| {
        match (deleted, inserted) {
            (0, 0) => {}
            (d, 0) => changes.push(Change::Delete {
                old_content: to_owned(&old[old_at..old_at + d]),
                old_range: LineRange::at(old_at, d),
                after_new_line: new_at,
            }),
            (0, i) => changes.push(Change::Insert {
                new_content: to_owned(&new[new_at..new_at + i]),
                new_range: LineRange::at(new_at, i),
                after_old_line: old_at,
            }),
            (d, i) => changes.push(Change::Modify {
                old_content: to_owned(&old[old_at..old_at + d]),
                new_content: to_owned(&new[new_at..new_at + i]),
                old_range: LineRange::at(old_at, d),
                new_range: LineRange::at(new_at, i),
            }),
        }
    };

    for op in ops {
        match *op {
            DiffOp::Equal {
                old_index,
                new_index,
                len,
            } => {
                if len == 0 {
                    continue;
                }
                flush(&mut changes, old_at, new_at, deleted, inserted);
                changes.push(Change::Unchanged {
                    lines: to_owned(&old[old_index..old_index + len]),
                    old_range: LineRange::at(old_index, len),
                    new_range: LineRange::at(new_index, len),
                });
                old_at = old_index + len;
                new_at = new_index + len;
                deleted = 0;
                inserted = 0;
            }
            DiffOp::Delete { old_len, .. } => deleted += old_len,
            DiffOp::Insert { new_len, .. } => inserted += new_len,
            DiffOp::Replace {
                old_len, new_len, ..
            } => {
                deleted += old_len;
                inserted += new_len;
            }
        }
    }
    flush(&mut changes, old_at, new_at, deleted, inserted);

    // A script may split one equal run in two; merge them.
    let mut merged: Vec<Change> = Vec::with_capacity(changes.len());
    for change in changes {
        if let (
            Some(Change::Unchanged {
                lines: prev_lines,
                old_range: prev_old,
                new_range: prev_new,
            }),
            Change::Unchanged {
                lines,
                old_range,
                new_range,
            },
        ) = (merged.last_mut(), &change)
        {
            prev_lines.extend(lines.iter().cloned());
            prev_old.end = old_range.end;
            prev_new.end = new_range.end;
            continue;
        }
        merged.push(change);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DiffEngine {
        DiffEngine::new(1024)
    }

    fn kinds(result: &DiffResult) -> Vec<ChangeKind> {
        result.changes.iter().map(Change::kind).collect()
    }

    #[test]
    fn test_identical_bodies() {
        let result = engine().diff("a\nb\n", "a\nb\n").unwrap();
        assert!(result.is_identical());
        assert_eq!(kinds(&result), vec![ChangeKind::Unchanged]);
        assert_eq!(result.summary().unchanged_lines, 2);
    }

    #[test]
    fn test_empty_bodies() {
        let result = engine().diff("", "").unwrap();
        assert!(result.changes.is_empty());
        assert!(result.is_identical());

        let result = engine().diff("", "new\n").unwrap();
        assert_eq!(
            result.changes,
            vec![Change::Insert {
                new_content: vec!["new\n".into()],
                new_range: LineRange { start: 1, end: 1 },
                after_old_line: 0,
            }]
        );
    }

    #[test]
    fn test_single_line_edit_is_modify() {
        let result = engine().diff("Hello world", "Hello there world").unwrap();
        assert_eq!(
            result.changes,
            vec![Change::Modify {
                old_content: vec!["Hello world".into()],
                new_content: vec!["Hello there world".into()],
                old_range: LineRange { start: 1, end: 1 },
                new_range: LineRange { start: 1, end: 1 },
            }]
        );
    }

    #[test]
    fn test_trailing_whitespace_is_modify() {
        let result = engine().diff("a\nb\nc\n", "a\nb  \nc\n").unwrap();
        assert_eq!(
            kinds(&result),
            vec![ChangeKind::Unchanged, ChangeKind::Modify, ChangeKind::Unchanged]
        );
        let result = engine().diff("a\nb\n", "a\nb").unwrap();
        assert_eq!(kinds(&result), vec![ChangeKind::Unchanged, ChangeKind::Modify]);
    }

    #[test]
    fn test_ranges_are_one_indexed_inclusive() {
        let result = engine().diff("a\nb\nc\nd\n", "a\nd\n").unwrap();
        assert_eq!(
            result.changes[1],
            Change::Delete {
                old_content: vec!["b\n".into(), "c\n".into()],
                old_range: LineRange { start: 2, end: 3 },
                after_new_line: 1,
            }
        );
        match &result.changes[2] {
            Change::Unchanged {
                old_range,
                new_range,
                ..
            } => {
                assert_eq!(*old_range, LineRange { start: 4, end: 4 });
                assert_eq!(*new_range, LineRange { start: 2, end: 2 });
            }
            other => panic!("unexpected change {other:?}"),
        }
    }

    #[test]
    fn test_delete_and_insert_coalesce_into_modify() {
        let result = engine()
            .diff("keep\nold1\nold2\nkeep2\n", "keep\nnew1\nkeep2\n")
            .unwrap();
        assert_eq!(
            kinds(&result),
            vec![ChangeKind::Unchanged, ChangeKind::Modify, ChangeKind::Unchanged]
        );
        let summary = result.summary();
        assert_eq!(summary.deleted_lines, 2);
        assert_eq!(summary.inserted_lines, 1);
        assert_eq!(summary.changed_regions, 1);
    }

    #[test]
    fn test_apply_reconstructs_target() {
        let old = "one\ntwo\nthree\nfour\n";
        let new = "zero\none\n2\nthree\n";
        let result = engine().diff(old, new).unwrap();
        assert_eq!(result.apply(old).unwrap(), new);
    }

    #[test]
    fn test_apply_rejects_wrong_base() {
        let result = engine().diff("a\nb\n", "a\nc\n").unwrap();
        assert!(matches!(
            result.apply("x\nb\n"),
            Err(VersionError::PatchMismatch { line: 1 })
        ));
        assert!(matches!(
            result.apply("a\nb\nextra\n"),
            Err(VersionError::PatchMismatch { line: 3 })
        ));
    }

    #[test]
    fn test_invert_mirrors_diff() {
        let a = "x\ny\nz\n";
        let b = "x\nY\nz\nw\n";
        let forward = engine().diff(a, b).unwrap();
        let backward = engine().diff(b, a).unwrap();
        assert_eq!(forward.invert(), backward);
        assert_eq!(forward.invert().apply(b).unwrap(), a);
    }

    #[test]
    fn test_too_large() {
        let engine = DiffEngine::new(4);
        assert!(matches!(
            engine.diff("12345", "1"),
            Err(VersionError::TooLarge { size: 5, limit: 4 })
        ));
        assert!(matches!(
            engine.diff("1", "12345"),
            Err(VersionError::TooLarge { .. })
        ));
        assert!(engine.diff("1234", "").is_ok());
    }

    #[test]
    fn test_identical_bodies_ignore_deadline() {
        let engine = engine().with_timeout(Duration::ZERO);
        let result = engine.diff("a\nb\n", "a\nb\n").unwrap();
        assert!(result.is_identical());
    }

    #[test]
    fn test_expired_deadline_reports_whole_body_modify() {
        let engine = engine().with_timeout(Duration::ZERO);
        let old = "keep\nold\nkeep2\n";
        let new = "keep\nnew\nkeep2\n";
        let result = engine.diff(old, new).unwrap();
        assert_eq!(kinds(&result), vec![ChangeKind::Modify]);
        assert_eq!(result.apply(old).unwrap(), new);
        assert_eq!(result.invert().apply(new).unwrap(), old);

        // One side empty degrades to a plain insert or delete.
        let result = engine.diff("", new).unwrap();
        assert_eq!(kinds(&result), vec![ChangeKind::Insert]);
        let result = engine.diff(old, "").unwrap();
        assert_eq!(kinds(&result), vec![ChangeKind::Delete]);
    }

    #[test]
    fn test_edit_cap_reports_whole_body_modify() {
        let old = "a\nb\nc\nd\n";
        let new = "a\nB\nc\nD\n";
        let uncapped = engine().diff(old, new).unwrap();
        assert_eq!(uncapped.summary().changed_regions, 2);

        let capped = engine().with_max_edit_lines(3).diff(old, new).unwrap();
        assert_eq!(
            capped.changes,
            vec![Change::Modify {
                old_content: vec!["a\n".into(), "b\n".into(), "c\n".into(), "d\n".into()],
                new_content: vec!["a\n".into(), "B\n".into(), "c\n".into(), "D\n".into()],
                old_range: LineRange { start: 1, end: 4 },
                new_range: LineRange { start: 1, end: 4 },
            }]
        );
        assert_eq!(capped.apply(old).unwrap(), new);
    }

    #[test]
    fn test_unrelated_bodies_at_the_limit_finish_in_bounded_time() {
        let engine = DiffEngine::default().with_timeout(Duration::from_millis(250));
        let limit = engine.max_body_bytes();
        let old: String = ["x\n", "y\n"].iter().cycle().take(limit / 2).copied().collect();
        let new: String = ["p\n", "q\n"].iter().cycle().take(limit / 2).copied().collect();
        assert_eq!(old.len(), limit);

        let started = Instant::now();
        let result = engine.diff(&old, &new).unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_secs(30), "diff took {elapsed:?}");
        assert_eq!(kinds(&result), vec![ChangeKind::Modify]);
        assert_eq!(result.summary().deleted_lines, limit / 2);
        assert_eq!(result.apply(&old).unwrap(), new);
    }

    #[test]
    fn test_unified_patch_applies() {
        let patch = engine().unified("a\nb\n", "a\nc\n").unwrap();
        assert!(patch.contains("-b"));
        assert!(patch.contains("+c"));
        let parsed = diffy::Patch::from_str(&patch).unwrap();
        assert_eq!(diffy::apply("a\nb\n", &parsed).unwrap(), "a\nc\n");
    }

    #[test]
    fn test_line_range_display() {
        assert_eq!(LineRange { start: 3, end: 3 }.to_string(), "3");
        assert_eq!(LineRange { start: 3, end: 5 }.to_string(), "3-5");
        assert_eq!(LineRange { start: 3, end: 5 }.len(), 3);
    }
}
