//! Small shared helpers.
//!
//! Currently just log-preview truncation: rejected payloads (a megabyte of
//! markup, a malformed embedded blob, a PostgREST error body) should show up
//! in logs as a bounded preview, never in full.

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte
/// count indicator appended.
///
/// # Arguments
///
/// * `s` - The string to potentially truncate
/// * `max` - Maximum number of bytes to keep
///
/// # Returns
///
/// The original string if it fits, otherwise a truncated version with
/// `"…(+N bytes)"` appended. The cut is nudged back to a char boundary so
/// multi-byte content never splits mid-character.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}
