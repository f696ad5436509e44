//! Textual conflict markers: writing them into merged bodies and finding
//! them again.
//!
//! A block looks like:
//!
//! ```text
//! <<<<<<< version A
//! ours
//! ||||||| base
//! base (three-way merges only)
//! =======
//! theirs
//! >>>>>>> version B
//! ```
//!
//! Markers are at least seven characters wide. A merge whose inputs already
//! contain marker-like lines writes wider markers, one longer than the
//! longest such line, and the scanner only reads the widest complete blocks
//! of a body. A section whose last line had no `\n` gets one added so the
//! next marker starts on its own line; the marker that closes the section
//! is then tagged with [`NO_NEWLINE_TAG`].

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::detector::ConflictRegion;
use crate::config::MergeConfig;
use crate::diff::split_lines;

pub const START_CHAR: char = '<';
pub const BASE_CHAR: char = '|';
pub const SEPARATOR_CHAR: char = '=';
pub const END_CHAR: char = '>';

/// Narrowest marker written or recognised.
pub const MIN_MARKER_WIDTH: usize = 7;

/// Suffix of a marker line closing a section whose last line was
/// unterminated.
pub const NO_NEWLINE_TAG: &str = " (no newline)";

const MARKER_CHARS: [char; 4] = [START_CHAR, BASE_CHAR, SEPARATOR_CHAR, END_CHAR];

/// Labels written after the start, base and end markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerLabels {
    pub ours: String,
    pub theirs: String,
    pub base: String,
}

impl Default for MarkerLabels {
    fn default() -> Self {
        Self::from(&MergeConfig::default())
    }
}

impl From<&MergeConfig> for MarkerLabels {
    fn from(config: &MergeConfig) -> Self {
        Self {
            ours: config.ours_label.clone(),
            theirs: config.theirs_label.clone(),
            base: config.base_label.clone(),
        }
    }
}

/// Location of a conflict block within a merged body (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictMarker {
    pub start_line: usize,
    pub end_line: usize,
}

/// A complete marker block found in a body. Section ranges are zero-based
/// line indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictBlock {
    pub marker: ConflictMarker,
    /// Marker width the block was written with.
    pub width: usize,
    pub ours: Range<usize>,
    pub base: Option<Range<usize>>,
    pub theirs: Range<usize>,
    /// Sections whose last line had no terminator before the block was
    /// written.
    pub ours_unterminated: bool,
    pub base_unterminated: bool,
    pub theirs_unterminated: bool,
}

/// A line that reads as a marker: a run of one marker character at least
/// [`MIN_MARKER_WIDTH`] long, alone or followed by a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerLine<'a> {
    kind: char,
    width: usize,
    rest: &'a str,
}

impl MarkerLine<'_> {
    fn tagged(&self) -> bool {
        self.rest.ends_with(NO_NEWLINE_TAG)
    }

    fn is_separator(&self) -> bool {
        self.kind == SEPARATOR_CHAR && (self.rest.is_empty() || self.rest == NO_NEWLINE_TAG)
    }
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn marker_line(line: &str) -> Option<MarkerLine<'_>> {
    let line = strip_terminator(line);
    let kind = line.chars().next().filter(|c| MARKER_CHARS.contains(c))?;
    let width = line.len() - line.trim_start_matches(kind).len();
    let rest = &line[width..];
    (width >= MIN_MARKER_WIDTH && (rest.is_empty() || rest.starts_with(' '))).then_some(
        MarkerLine { kind, width, rest },
    )
}

/// Width for markers written into a merge of `bodies`: wider than every
/// marker-like line they contain.
pub(crate) fn marker_width(bodies: &[&str]) -> usize {
    bodies
        .iter()
        .flat_map(|body| split_lines(body))
        .filter_map(marker_line)
        .map(|m| m.width + 1)
        .fold(MIN_MARKER_WIDTH, usize::max)
}

// ----- Writing -----

/// Accumulates a merged body, tracking line numbers of conflict blocks.
pub(crate) struct MarkedBody<'a> {
    labels: &'a MarkerLabels,
    width: usize,
    body: String,
    lines: usize,
    markers: Vec<ConflictMarker>,
}

impl<'a> MarkedBody<'a> {
    /// Body whose markers are `width` characters wide; see [`marker_width`].
    pub(crate) fn new(labels: &'a MarkerLabels, width: usize) -> Self {
        Self {
            labels,
            width: width.max(MIN_MARKER_WIDTH),
            body: String::new(),
            lines: 0,
            markers: Vec::new(),
        }
    }

    fn push_line(&mut self, line: &str) {
        // Only the final line of a body may lack a terminator; anything
        // appended after it needs one.
        if !self.body.is_empty() && !self.body.ends_with('\n') {
            self.body.push('\n');
        }
        self.body.push_str(line);
        self.lines += 1;
    }

    pub(crate) fn push_lines(&mut self, lines: &[String]) {
        for line in lines {
            self.push_line(line);
        }
    }

    fn push_marker(&mut self, kind: char, label: Option<&str>, closes_unterminated: bool) {
        let mut line: String = std::iter::repeat(kind).take(self.width).collect();
        if let Some(label) = label {
            line.push(' ');
            line.push_str(label);
        }
        if closes_unterminated {
            line.push_str(NO_NEWLINE_TAG);
        }
        line.push('\n');
        self.push_line(&line);
    }

    pub(crate) fn push_conflict(&mut self, region: &ConflictRegion) {
        let unterminated = |lines: &[String]| lines.last().is_some_and(|l| !l.ends_with('\n'));
        let labels = self.labels;
        let start_line = self.lines + 1;

        self.push_marker(START_CHAR, Some(labels.ours.as_str()), false);
        self.push_lines(&region.ours);
        let mut open = unterminated(&region.ours);
        if let Some(base) = &region.base {
            self.push_marker(BASE_CHAR, Some(labels.base.as_str()), open);
            self.push_lines(base);
            open = unterminated(base);
        }
        self.push_marker(SEPARATOR_CHAR, None, open);
        self.push_lines(&region.theirs);
        self.push_marker(END_CHAR, Some(labels.theirs.as_str()), unterminated(&region.theirs));

        self.markers.push(ConflictMarker {
            start_line,
            end_line: self.lines,
        });
    }

    pub(crate) fn finish(self) -> (String, Vec<ConflictMarker>) {
        (self.body, self.markers)
    }
}

// ----- Scanning -----

fn parse_block(markers: &[Option<MarkerLine<'_>>], start: usize, width: usize) -> Option<ConflictBlock> {
    let mut base_at: Option<(usize, bool)> = None;
    let mut separator_at: Option<(usize, bool)> = None;

    for (index, marker) in markers.iter().enumerate().skip(start + 1) {
        let Some(marker) = marker.filter(|m| m.width == width) else {
            continue;
        };
        match (marker.kind, separator_at) {
            (START_CHAR, _) => return None,
            (BASE_CHAR, None) if base_at.is_none() => base_at = Some((index, marker.tagged())),
            (SEPARATOR_CHAR, None) if marker.is_separator() => {
                separator_at = Some((index, marker.tagged()))
            }
            (END_CHAR, Some((separator, separator_tagged))) => {
                let ours_end = base_at.map_or(separator, |(b, _)| b);
                return Some(ConflictBlock {
                    marker: ConflictMarker {
                        start_line: start + 1,
                        end_line: index + 1,
                    },
                    width,
                    ours: start + 1..ours_end,
                    base: base_at.map(|(b, _)| b + 1..separator),
                    theirs: separator + 1..index,
                    ours_unterminated: base_at.map_or(separator_tagged, |(_, tagged)| tagged),
                    base_unterminated: base_at.is_some() && separator_tagged,
                    theirs_unterminated: marker.tagged(),
                });
            }
            _ => {}
        }
    }
    None
}

fn scan(markers: &[Option<MarkerLine<'_>>], width: usize) -> Vec<ConflictBlock> {
    let mut blocks = Vec::new();
    let mut index = 0;

    while index < markers.len() {
        let opens = markers[index].is_some_and(|m| m.kind == START_CHAR && m.width == width);
        if opens {
            if let Some(block) = parse_block(markers, index, width) {
                index = block.marker.end_line;
                blocks.push(block);
                continue;
            }
        }
        index += 1;
    }
    blocks
}

/// Find the complete marker blocks of the widest marker width present in
/// `body`. Narrower marker-like lines are content, as are stray markers that
/// are not part of a start/separator/end sequence.
pub fn find_conflict_blocks(body: &str) -> Vec<ConflictBlock> {
    let lines = split_lines(body);
    let markers: Vec<Option<MarkerLine<'_>>> = lines.iter().map(|l| marker_line(l)).collect();

    let mut widths: Vec<usize> = markers
        .iter()
        .flatten()
        .filter(|m| m.kind == START_CHAR)
        .map(|m| m.width)
        .collect();
    widths.sort_unstable();
    widths.dedup();

    widths
        .into_iter()
        .rev()
        .map(|width| scan(&markers, width))
        .find(|blocks| !blocks.is_empty())
        .unwrap_or_default()
}

/// Whether `body` still contains at least one conflict block.
pub fn contains_conflict_markers(body: &str) -> bool {
    !find_conflict_blocks(body).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: Option<&[&str]>, ours: &[&str], theirs: &[&str]) -> ConflictRegion {
        let owned = |lines: &[&str]| lines.iter().map(|l| l.to_string()).collect::<Vec<_>>();
        ConflictRegion {
            base: base.map(owned),
            ours: owned(ours),
            theirs: owned(theirs),
            base_range: None,
            ours_range: None,
            theirs_range: None,
        }
    }

    #[test]
    fn test_written_block_layout() {
        let labels = MarkerLabels::default();
        let mut body = MarkedBody::new(&labels, MIN_MARKER_WIDTH);
        body.push_lines(&["intro\n".to_string()]);
        body.push_conflict(&region(Some(&["b\n"]), &["o\n"], &["t\n"]));
        let (text, markers) = body.finish();

        assert_eq!(
            text,
            "intro\n<<<<<<< version A\no\n||||||| base\nb\n=======\nt\n>>>>>>> version B\n"
        );
        assert_eq!(
            markers,
            vec![ConflictMarker {
                start_line: 2,
                end_line: 8
            }]
        );
    }

    #[test]
    fn test_unterminated_section_is_tagged() {
        let labels = MarkerLabels::default();
        let mut body = MarkedBody::new(&labels, MIN_MARKER_WIDTH);
        body.push_conflict(&region(None, &["tail"], &["other"]));
        let (text, _) = body.finish();
        assert_eq!(
            text,
            "<<<<<<< version A\ntail\n======= (no newline)\nother\n>>>>>>> version B (no newline)\n"
        );

        let blocks = find_conflict_blocks(&text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].ours_unterminated);
        assert!(!blocks[0].base_unterminated);
        assert!(blocks[0].theirs_unterminated);
    }

    #[test]
    fn test_unterminated_base_is_tagged_on_separator() {
        let labels = MarkerLabels::default();
        let mut body = MarkedBody::new(&labels, MIN_MARKER_WIDTH);
        body.push_conflict(&region(Some(&["orig"]), &["o\n"], &["t"]));
        let (text, _) = body.finish();
        assert_eq!(
            text,
            "<<<<<<< version A\no\n||||||| base\norig\n======= (no newline)\nt\n>>>>>>> version B (no newline)\n"
        );

        let block = &find_conflict_blocks(&text)[0];
        assert_eq!(
            (block.ours_unterminated, block.base_unterminated, block.theirs_unterminated),
            (false, true, true)
        );
    }

    #[test]
    fn test_marker_width_exceeds_marker_like_content() {
        assert_eq!(marker_width(&["plain\n", ""]), MIN_MARKER_WIDTH);
        assert_eq!(marker_width(&["Title\n=======\n"]), 8);
        assert_eq!(marker_width(&["a\n", "<<<<<<<<< x\n>>>>>>> y\n"]), 10);
        // Too short, or not followed by a space.
        assert_eq!(marker_width(&["======\n=======x\n"]), MIN_MARKER_WIDTH);
    }

    #[test]
    fn test_wide_markers_shield_marker_like_content() {
        let labels = MarkerLabels::default();
        let ours = "Intro\n=======\n";
        let mut body = MarkedBody::new(&labels, marker_width(&[ours, "Other\n"]));
        body.push_conflict(&region(None, &["Intro\n", "=======\n"], &["Other\n"]));
        let (text, markers) = body.finish();
        assert_eq!(
            text,
            "<<<<<<<< version A\nIntro\n=======\n========\nOther\n>>>>>>>> version B\n"
        );

        let blocks = find_conflict_blocks(&text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].marker, markers[0]);
        assert_eq!(blocks[0].width, 8);
        assert_eq!(blocks[0].ours, 1..3);
        assert_eq!(blocks[0].theirs, 4..5);
    }

    #[test]
    fn test_widest_blocks_win() {
        // A narrow block inside a wide one is content of the wide block.
        let body = "<<<<<<<< a\n<<<<<<< x\n1\n=======\n2\n>>>>>>> y\n========\n3\n>>>>>>>> b\n";
        let blocks = find_conflict_blocks(body);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].width, 8);
        assert_eq!(blocks[0].ours, 1..6);
        assert_eq!(blocks[0].theirs, 7..8);
    }

    #[test]
    fn test_find_blocks_round_trips_written_markers() {
        let labels = MarkerLabels::default();
        let mut body = MarkedBody::new(&labels, MIN_MARKER_WIDTH);
        body.push_conflict(&region(None, &["a\n"], &["b\n", "c\n"]));
        body.push_lines(&["between\n".to_string()]);
        body.push_conflict(&region(Some(&["base\n"]), &[], &["x\n"]));
        let (text, markers) = body.finish();

        let blocks = find_conflict_blocks(&text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].marker, markers[0]);
        assert_eq!(blocks[0].ours, 1..2);
        assert_eq!(blocks[0].base, None);
        assert_eq!(blocks[0].theirs, 3..5);
        assert_eq!(blocks[1].marker, markers[1]);
        assert_eq!(blocks[1].ours, 8..8);
        assert_eq!(blocks[1].base, Some(9..10));
        assert_eq!(blocks[1].theirs, 11..12);
        assert!(contains_conflict_markers(&text));
    }

    #[test]
    fn test_markdown_underline_is_not_a_marker() {
        let body = "Title\n=======\n\nSome text\n";
        assert!(find_conflict_blocks(body).is_empty());
        assert!(!contains_conflict_markers(body));
    }

    #[test]
    fn test_incomplete_blocks_are_ignored() {
        assert!(!contains_conflict_markers("<<<<<<< a\nx\n=======\ny\n"));
        assert!(!contains_conflict_markers("<<<<<<< a\nx\n>>>>>>> b\n"));
        // Marker widths must agree within a block.
        assert!(!contains_conflict_markers("<<<<<<<<< a\nx\n=======\ny\n>>>>>>> b\n"));
        assert!(!contains_conflict_markers("<<<<<<<x\n=======\n>>>>>>> b\n"));
        // A restart discards the earlier, unfinished block.
        let body = "<<<<<<< a\nx\n<<<<<<< a\ny\n=======\nz\n>>>>>>> b\n";
        let blocks = find_conflict_blocks(body);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].marker.start_line, 3);
    }

    #[test]
    fn test_crlf_markers_are_recognised() {
        assert!(contains_conflict_markers("<<<<<<< a\r\nx\r\n=======\r\ny\r\n>>>>>>> b\r\n"));
    }
}
