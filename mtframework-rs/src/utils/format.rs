//! Formatting utilities

use glob::{MatchOptions, Pattern};
use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a percentage
pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// Space saved by compression, as a percentage of the original size
pub fn format_compression_ratio(original: u64, compressed: u64) -> String {
    if original == 0 {
        "N/A".to_string()
    } else {
        let ratio = 100.0 - (compressed as f64 / original as f64 * 100.0);
        format_percentage(ratio)
    }
}

pub fn format_vec3(v: [f32; 3]) -> String {
    format!("({:.3}, {:.3}, {:.3})", v[0], v[1], v[2])
}

/// Case-insensitive wildcard match on member names.
///
/// Both separator styles are accepted. A pattern without wildcards matches
/// any name containing it.
pub fn matches_pattern(text: &str, pattern: &str) -> bool {
    if pattern.is_empty() || pattern == "*" {
        return true;
    }
    let text = text.replace('\\', "/").to_lowercase();
    let pattern = pattern.replace('\\', "/").to_lowercase();
    if !pattern.contains(['*', '?', '[']) {
        return text.contains(&pattern);
    }
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    Pattern::new(&pattern).is_ok_and(|pattern| pattern.matches_with(&text, options))
}
