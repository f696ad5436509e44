//! Subcommand implementations.

pub mod config;
pub mod merge;
pub mod style;
pub mod versions;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read a body from `path`, or from standard input when `path` is `-`.
pub fn read_body(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("failed to read body from standard input")?;
        return Ok(body);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Shorten `s` to at most `max_chars` characters for table display.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer string", 8), "a lon...");
        assert_eq!(truncate("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_read_body_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("body.md");
        std::fs::write(&path, "# Title\n").unwrap();
        assert_eq!(read_body(&path).unwrap(), "# Title\n");
        assert!(read_body(&dir.path().join("missing.md")).is_err());
    }
}
