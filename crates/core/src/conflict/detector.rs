//! Conflict detection.
//!
//! The three-way detector diffs the base against each side and walks the two
//! edit lists together. Edits that overlap in the base (or share an
//! insertion point) are clustered; a cluster touched by only one side, or
//! where both sides produce the same lines, resolves cleanly. Everything else
//! is a [`ConflictRegion`].
//!
//! Without a base the detector falls back to a two-way comparison where every
//! `modify` region between the two versions is a conflict.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diff::{split_lines, Change, DiffEngine, DiffResult, LineRange};
use crate::errors::VersionError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which side a cleanly merged hunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Ours,
    Theirs,
    /// Both sides made the same change.
    Both,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// A region where the two versions disagree and neither can win
/// automatically. Line contents keep their `\n` terminators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRegion {
    /// Common-ancestor lines; `None` for two-way comparisons.
    pub base: Option<Vec<String>>,
    /// Lines from version A.
    pub ours: Vec<String>,
    /// Lines from version B.
    pub theirs: Vec<String>,
    pub base_range: Option<LineRange>,
    pub ours_range: Option<LineRange>,
    pub theirs_range: Option<LineRange>,
}

impl ConflictRegion {
    /// Two-way conflict from a `modify` record of `diff(a, b)`.
    pub(crate) fn from_modify(change: &Change) -> Option<Self> {
        match change {
            Change::Modify {
                old_content,
                new_content,
                old_range,
                new_range,
            } => Some(Self {
                base: None,
                ours: old_content.clone(),
                theirs: new_content.clone(),
                base_range: None,
                ours_range: Some(*old_range),
                theirs_range: Some(*new_range),
            }),
            _ => None,
        }
    }
}

/// One step of a three-way merge, in base order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hunk {
    /// Base lines neither side touched.
    Stable(Vec<String>),
    /// A change that merges cleanly.
    Resolved {
        base: Vec<String>,
        lines: Vec<String>,
        side: Side,
    },
    Conflict(ConflictRegion),
}

/// A single edit of one side against the base.
struct Edit {
    side: Side,
    base: Range<usize>,
    lines: Vec<String>,
}

fn edits_of(side: Side, diff: DiffResult) -> impl Iterator<Item = Edit> {
    diff.changes
        .into_iter()
        .filter(|c| !matches!(c, Change::Unchanged { .. }))
        .map(move |c| Edit {
            side,
            base: c.old_span(),
            lines: c.new_lines().to_vec(),
        })
}

/// Overlapping ranges interact, and so does an insertion point touching
/// another edit.
fn interacts(a: &Range<usize>, b: &Range<usize>) -> bool {
    if a.is_empty() || b.is_empty() {
        a.start <= b.end && b.start <= a.end
    } else {
        a.start < b.end && b.start < a.end
    }
}

/// Rebuild `base[range]` with one side's edits applied.
fn apply_edits(base: &[&str], range: Range<usize>, edits: &[&Edit]) -> Vec<String> {
    let mut out = Vec::new();
    let mut pos = range.start;
    for edit in edits {
        out.extend(base[pos..edit.base.start].iter().map(|l| (*l).to_owned()));
        out.extend(edit.lines.iter().cloned());
        pos = edit.base.end;
    }
    out.extend(base[pos..range.end].iter().map(|l| (*l).to_owned()));
    out
}

fn range_at(index: usize, len: usize) -> Option<LineRange> {
    (len > 0).then(|| LineRange::at(index, len))
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Finds overlapping edits between two versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector {
    engine: DiffEngine,
}

impl ConflictDetector {
    pub fn new(engine: DiffEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &DiffEngine {
        &self.engine
    }

    /// Conflicts between `ours` and `theirs` relative to `base`.
    pub fn detect(
        &self,
        base: &str,
        ours: &str,
        theirs: &str,
    ) -> Result<Vec<ConflictRegion>, VersionError> {
        Ok(self
            .analyze(base, ours, theirs)?
            .into_iter()
            .filter_map(|hunk| match hunk {
                Hunk::Conflict(region) => Some(region),
                _ => None,
            })
            .collect())
    }

    /// Conflicts between two versions with no common ancestor: every region
    /// that is neither unchanged nor a pure insertion on one side.
    pub fn detect_two_way(&self, ours: &str, theirs: &str) -> Result<Vec<ConflictRegion>, VersionError> {
        let diff = self.engine.diff(ours, theirs)?;
        let conflicts = Self::two_way_conflicts(&diff);
        info!(conflicts = conflicts.len(), "two-way conflict detection complete");
        Ok(conflicts)
    }

    /// Two-way conflicts of an already computed `diff(ours, theirs)`.
    pub fn two_way_conflicts(diff: &DiffResult) -> Vec<ConflictRegion> {
        diff.changes
            .iter()
            .filter_map(ConflictRegion::from_modify)
            .collect()
    }

    /// Split a three-way comparison into stable, resolved and conflicting
    /// hunks covering the whole base in order.
    pub fn analyze(&self, base: &str, ours: &str, theirs: &str) -> Result<Vec<Hunk>, VersionError> {
        let ours_diff = self.engine.diff(base, ours)?;
        let theirs_diff = self.engine.diff(base, theirs)?;
        let base_lines = split_lines(base);

        let mut edits: Vec<Edit> = edits_of(Side::Ours, ours_diff)
            .chain(edits_of(Side::Theirs, theirs_diff))
            .collect();
        // Insertion points sort ahead of edits starting at the same line so
        // they join the cluster they touch.
        edits.sort_by_key(|e| (e.base.start, !e.base.is_empty()));

        info!(
            base_lines = base_lines.len(),
            edits = edits.len(),
            "detecting conflicts"
        );

        let mut hunks = Vec::new();
        let mut cursor = 0;
        let (mut ours_pos, mut theirs_pos) = (0, 0);
        let mut i = 0;

        while i < edits.len() {
            let start = edits[i].base.start;
            let mut end = edits[i].base.end;
            let mut cluster = vec![&edits[i]];
            let mut j = i + 1;
            while j < edits.len() && cluster.iter().any(|m| interacts(&m.base, &edits[j].base)) {
                end = end.max(edits[j].base.end);
                cluster.push(&edits[j]);
                j += 1;
            }

            if cursor < start {
                let stable: Vec<String> = base_lines[cursor..start].iter().map(|l| (*l).to_owned()).collect();
                ours_pos += stable.len();
                theirs_pos += stable.len();
                hunks.push(Hunk::Stable(stable));
            }

            let ours_edits: Vec<&Edit> = cluster.iter().copied().filter(|e| e.side == Side::Ours).collect();
            let theirs_edits: Vec<&Edit> = cluster.iter().copied().filter(|e| e.side == Side::Theirs).collect();
            let base_part: Vec<String> = base_lines[start..end].iter().map(|l| (*l).to_owned()).collect();
            let ours_lines = apply_edits(&base_lines, start..end, &ours_edits);
            let theirs_lines = apply_edits(&base_lines, start..end, &theirs_edits);
            let (ours_len, theirs_len) = (ours_lines.len(), theirs_lines.len());

            let hunk = if theirs_edits.is_empty() {
                Hunk::Resolved {
                    base: base_part,
                    lines: ours_lines,
                    side: Side::Ours,
                }
            } else if ours_edits.is_empty() {
                Hunk::Resolved {
                    base: base_part,
                    lines: theirs_lines,
                    side: Side::Theirs,
                }
            } else if ours_lines == theirs_lines {
                Hunk::Resolved {
                    base: base_part,
                    lines: ours_lines,
                    side: Side::Both,
                }
            } else {
                debug!(base_start = start + 1, base_end = end, "conflict detected");
                Hunk::Conflict(ConflictRegion {
                    base_range: range_at(start, base_part.len()),
                    base: Some(base_part),
                    ours_range: range_at(ours_pos, ours_len),
                    theirs_range: range_at(theirs_pos, theirs_len),
                    ours: ours_lines,
                    theirs: theirs_lines,
                })
            };
            hunks.push(hunk);

            ours_pos += ours_len;
            theirs_pos += theirs_len;
            cursor = end;
            i = j;
        }

        if cursor < base_lines.len() {
            hunks.push(Hunk::Stable(
                base_lines[cursor..].iter().map(|l| (*l).to_owned()).collect(),
            ));
        }

        Ok(hunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ConflictDetector {
        ConflictDetector::default()
    }

    #[test]
    fn test_identical_versions_have_no_conflicts() {
        let base = "line1\nline2\nline3\n";
        assert!(detector().detect(base, base, base).unwrap().is_empty());
        let hunks = detector().analyze(base, base, base).unwrap();
        assert_eq!(hunks.len(), 1);
        assert!(matches!(hunks[0], Hunk::Stable(_)));
    }

    #[test]
    fn test_one_sided_change_resolves() {
        let base = "line1\nline2\nline3\n";
        let ours = "line1\nmodified\nline3\n";
        let hunks = detector().analyze(base, ours, base).unwrap();
        assert!(hunks.iter().any(|h| matches!(
            h,
            Hunk::Resolved { side: Side::Ours, lines, .. } if lines == &vec!["modified\n".to_string()]
        )));
        assert!(detector().detect(base, base, ours).unwrap().is_empty());
    }

    #[test]
    fn test_non_overlapping_changes_resolve() {
        let base = "aaa\nbbb\nccc\nddd\neee\n";
        let ours = "AAA\nbbb\nccc\nddd\neee\n";
        let theirs = "aaa\nbbb\nccc\nddd\nEEE\n";
        assert!(detector().detect(base, ours, theirs).unwrap().is_empty());
    }

    #[test]
    fn test_same_change_on_both_sides_resolves() {
        let base = "old\n";
        let hunks = detector().analyze(base, "new\n", "new\n").unwrap();
        assert_eq!(
            hunks,
            vec![Hunk::Resolved {
                base: vec!["old\n".into()],
                lines: vec!["new\n".into()],
                side: Side::Both,
            }]
        );
    }

    #[test]
    fn test_overlapping_changes_conflict() {
        let base = "line1\noriginal\nline3\n";
        let ours = "line1\nours_version\nline3\n";
        let theirs = "line1\ntheirs_version\nline3\n";
        let conflicts = detector().detect(base, ours, theirs).unwrap();
        assert_eq!(conflicts.len(), 1);
        let region = &conflicts[0];
        assert_eq!(region.base.as_deref(), Some(&["original\n".to_string()][..]));
        assert_eq!(region.ours, vec!["ours_version\n".to_string()]);
        assert_eq!(region.theirs, vec!["theirs_version\n".to_string()]);
        assert_eq!(region.base_range, Some(LineRange { start: 2, end: 2 }));
        assert_eq!(region.ours_range, Some(LineRange { start: 2, end: 2 }));
    }

    #[test]
    fn test_insertions_at_same_point_conflict() {
        let base = "a\nb\n";
        let conflicts = detector().detect(base, "a\nx\nb\n", "a\ny\nb\n").unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].base_range, None);
        assert_eq!(conflicts[0].base.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_edit_against_delete_conflicts() {
        let base = "a\nb\nc\n";
        let conflicts = detector().detect(base, "a\nB\nc\n", "a\nc\n").unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].ours, vec!["B\n".to_string()]);
        assert!(conflicts[0].theirs.is_empty());
        assert_eq!(conflicts[0].theirs_range, None);
    }

    #[test]
    fn test_chained_overlaps_form_one_region() {
        let base = "1\n2\n3\n4\n";
        // Ours rewrites 1-2, theirs rewrites 2-3: one region spanning 1-3.
        let conflicts = detector()
            .detect(base, "one\ntwo\n3\n4\n", "1\nTWO\nTHREE\n4\n")
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].base_range, Some(LineRange { start: 1, end: 3 }));
        assert_eq!(
            conflicts[0].ours,
            vec!["one\n".to_string(), "two\n".into(), "3\n".into()]
        );
        assert_eq!(
            conflicts[0].theirs,
            vec!["1\n".to_string(), "TWO\n".into(), "THREE\n".into()]
        );
    }

    #[test]
    fn test_hunks_cover_both_sides() {
        let base = "a\nb\nc\nd\ne\n";
        let ours = "a\nB\nc\nd\ne\nf\n";
        let theirs = "a\nb\nc\nD\ne\n";
        let hunks = detector().analyze(base, ours, theirs).unwrap();
        let merged: String = hunks
            .iter()
            .flat_map(|h| match h {
                Hunk::Stable(lines) | Hunk::Resolved { lines, .. } => lines.clone(),
                Hunk::Conflict(_) => panic!("unexpected conflict"),
            })
            .collect();
        assert_eq!(merged, "a\nB\nc\nD\ne\nf\n");
    }

    #[test]
    fn test_two_way_flags_only_modifications() {
        let conflicts = detector()
            .detect_two_way("keep\nold\nend\n", "keep\nnew\nend\nextra\n")
            .unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].base.is_none());
        assert_eq!(conflicts[0].ours, vec!["old\n".to_string()]);
        assert_eq!(conflicts[0].theirs, vec!["new\n".to_string()]);

        assert!(detector()
            .detect_two_way("a\n", "a\nb\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_size_bound_applies() {
        let detector = ConflictDetector::new(DiffEngine::new(3));
        assert!(matches!(
            detector.detect("abcd", "a", "b"),
            Err(VersionError::TooLarge { .. })
        ));
    }
}
