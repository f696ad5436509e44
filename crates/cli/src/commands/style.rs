//! Shared styling utilities for terminal output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold).
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// A line removed by a diff, prefixed with `-` (red).
pub fn removed(line: &str) -> String {
    Style::new().red().apply_to(format!("-{}", line)).to_string()
}

/// A line added by a diff, prefixed with `+` (green).
pub fn added(line: &str) -> String {
    Style::new().green().apply_to(format!("+{}", line)).to_string()
}

/// Marker for the current version in listings.
pub fn current_marker(is_current: bool) -> String {
    if is_current {
        Style::new().green().apply_to("●").to_string()
    } else {
        Style::new().dim().apply_to("○").to_string()
    }
}
