//! Conflict detection, merging, and resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Detection** -- finding overlapping edits between two versions, with or
//!    without a common ancestor.
//! 2. **Merging** -- combining versions, marking whatever cannot combine.
//! 3. **Resolution** -- replacing marker blocks with a chosen side.

pub mod detector;
pub mod markers;
pub mod merger;
pub mod resolver;

pub use detector::{ConflictDetector, ConflictRegion, Hunk, Side};
pub use markers::{
    contains_conflict_markers, find_conflict_blocks, ConflictBlock, ConflictMarker, MarkerLabels,
};
pub use merger::{MergeEngine, MergeOptions, MergeResult};
pub use resolver::{ConflictResolver, Resolution};
