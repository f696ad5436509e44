//! Conflict resolution actions.
//!
//! The [`ConflictResolver`] replaces each marker block in a merged body with
//! the content of a chosen side, producing a body that can be committed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::markers::{find_conflict_blocks, ConflictBlock};
use crate::diff::split_lines;
use crate::errors::VersionError;

/// Named resolution strategies for one conflict block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "text", rename_all = "snake_case")]
pub enum Resolution {
    /// Keep version A's lines.
    Ours,
    /// Keep version B's lines.
    Theirs,
    /// Keep A's lines followed by B's.
    Both,
    /// Keep the common ancestor's lines (three-way blocks only).
    Base,
    /// Replace the block with custom text.
    Custom(String),
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ours" => Ok(Self::Ours),
            "theirs" => Ok(Self::Theirs),
            "both" => Ok(Self::Both),
            "base" => Ok(Self::Base),
            other => Err(format!(
                "unknown resolution '{other}' (expected ours, theirs, both or base)"
            )),
        }
    }
}

/// Stateless marker-block resolution.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Resolve every block in `body` with the same strategy.
    pub fn resolve_all(body: &str, resolution: &Resolution) -> Result<String, VersionError> {
        let count = find_conflict_blocks(body).len();
        Self::resolve(body, &vec![resolution.clone(); count])
    }

    /// Resolve the blocks of `body` in order, one resolution per block.
    ///
    /// Fails with [`VersionError::InvalidMergeState`] when the number of
    /// resolutions differs from the number of blocks, or when `Base` is
    /// chosen for a block written without a base section.
    pub fn resolve(body: &str, resolutions: &[Resolution]) -> Result<String, VersionError> {
        let lines = split_lines(body);
        let blocks = find_conflict_blocks(body);
        if blocks.len() != resolutions.len() {
            return Err(VersionError::InvalidMergeState {
                conflicts: blocks.len(),
            });
        }

        let mut out = String::with_capacity(body.len());
        let mut pos = 0;
        for (index, (block, resolution)) in blocks.iter().zip(resolutions).enumerate() {
            let block_start = block.marker.start_line - 1;
            out.extend(lines[pos..block_start].iter().copied());
            let more_follows = block.marker.end_line < lines.len();
            Self::write_resolution(&mut out, &lines, block, resolution, more_follows).ok_or(
                VersionError::InvalidMergeState {
                    conflicts: blocks.len() - index,
                },
            )?;
            debug!(
                start_line = block.marker.start_line,
                ?resolution,
                "resolved conflict block"
            );
            pos = block.marker.end_line;
        }
        out.extend(lines[pos..].iter().copied());

        info!(conflicts = blocks.len(), "conflict markers resolved");
        Ok(out)
    }

    /// Returns `None` when the block lacks the requested section.
    ///
    /// A chosen section that ended without a newline before the block was
    /// written ends without one again when nothing follows the block.
    fn write_resolution(
        out: &mut String,
        lines: &[&str],
        block: &ConflictBlock,
        resolution: &Resolution,
        more_follows: bool,
    ) -> Option<()> {
        let unterminated = match resolution {
            Resolution::Ours => {
                out.extend(lines[block.ours.clone()].iter().copied());
                block.ours_unterminated
            }
            Resolution::Theirs => {
                out.extend(lines[block.theirs.clone()].iter().copied());
                block.theirs_unterminated
            }
            Resolution::Both => {
                out.extend(lines[block.ours.clone()].iter().copied());
                out.extend(lines[block.theirs.clone()].iter().copied());
                if block.theirs.is_empty() {
                    block.ours_unterminated
                } else {
                    block.theirs_unterminated
                }
            }
            Resolution::Base => {
                let base = block.base.clone()?;
                out.extend(lines[base].iter().copied());
                block.base_unterminated
            }
            Resolution::Custom(text) => {
                out.push_str(text);
                if more_follows && !text.is_empty() && !text.ends_with('\n') {
                    out.push('\n');
                }
                false
            }
        };
        if unterminated && !more_follows && out.ends_with('\n') {
            out.pop();
        }
        Some(())
    }
}
