//! Embedded-data extraction from page markup.
//!
//! The dining pages ship their data as JavaScript template-literal
//! assignments embedded somewhere in the page:
//!
//! ```text
//! var dining_nodes = `{"locations": [ ... ]}`;
//! ```
//!
//! This module locates such an assignment by variable name, decodes the
//! template-literal body using JavaScript string-escape rules, and parses
//! the result as JSON. No HTML parsing is involved; a pattern match over the
//! raw page text is sufficient and keeps markup drift out of scope.
//!
//! # Failure kinds
//!
//! Absence and malformation are deliberately distinct ([`ExtractError`]):
//! many pages legitimately lack one of the expected variables (logged at
//! info level), while a variable that is present but undecodable points at
//! upstream schema drift (logged at warn level with a payload preview).
//! Neither aborts anything; both flow onward as absence.

use crate::utils::truncate_for_log;
use regex::Regex;
use serde_json::Value;
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why an embedded variable produced no value.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No assignment of the named variable exists in the page text.
    #[error("variable `{0}` not found in page text")]
    NotFound(String),
    /// The template-literal body contains an invalid escape sequence.
    #[error("template literal for `{var}` has a bad escape: {source}")]
    Escape {
        var: String,
        #[source]
        source: EscapeError,
    },
    /// The body decoded cleanly but is not valid JSON.
    #[error("embedded JSON for `{var}` failed to parse: {source}")]
    Json {
        var: String,
        /// Truncated preview of the decoded payload, for diagnosis.
        preview: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An invalid escape sequence encountered while decoding a template literal.
#[derive(Debug, Error, PartialEq)]
#[error("{message} at byte {offset}")]
pub struct EscapeError {
    /// Byte offset of the offending backslash within the literal body.
    pub offset: usize,
    pub message: String,
}

impl EscapeError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Extract and decode the JSON value assigned to `variable` in `page_text`.
///
/// Searches for `var|let|const <variable> = \`...\`` (non-greedy, spanning
/// lines), decodes the captured body with [`decode_js_escapes`], and parses
/// the result as JSON.
///
/// # Arguments
///
/// * `variable` - The assigned variable name, e.g. `"dining_nodes"`
/// * `page_text` - Raw page markup to search
///
/// # Returns
///
/// The parsed JSON value, or an [`ExtractError`] describing which stage
/// produced nothing. Callers treating absence and malformation alike should
/// use [`extract_or_log`] instead.
pub fn extract(variable: &str, page_text: &str) -> Result<Value, ExtractError> {
    let pattern = assignment_regex(variable);
    let Some(captures) = pattern.captures(page_text) else {
        return Err(ExtractError::NotFound(variable.to_string()));
    };
    let raw = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

    let decoded = decode_js_escapes(raw).map_err(|source| ExtractError::Escape {
        var: variable.to_string(),
        source,
    })?;

    serde_json::from_str(&decoded).map_err(|source| ExtractError::Json {
        var: variable.to_string(),
        preview: truncate_for_log(&decoded, 160),
        source,
    })
}

/// Extract `variable` from `page_text`, logging failures instead of
/// returning them.
///
/// This is the driver-facing form of [`extract`]: absence is an expected
/// condition (info), decode failures are drift worth noticing (warn), and
/// both collapse to `None` so downstream flattening sees a uniform
/// value-or-absent input.
pub fn extract_or_log(variable: &str, page_text: &str) -> Option<Value> {
    match extract(variable, page_text) {
        Ok(value) => {
            debug!(var = %variable, "decoded embedded payload");
            Some(value)
        }
        Err(ExtractError::NotFound(_)) => {
            info!(var = %variable, "embedded variable not present in page");
            None
        }
        Err(err @ ExtractError::Escape { .. }) => {
            warn!(var = %variable, error = %err, "failed to decode embedded payload");
            None
        }
        Err(ExtractError::Json {
            preview, source, ..
        }) => {
            warn!(
                var = %variable,
                error = %source,
                payload = %preview,
                "embedded payload is not valid JSON"
            );
            None
        }
    }
}

/// Build the assignment pattern for a variable name.
///
/// `(?s)` lets the literal body span lines; the body capture is non-greedy
/// so it stops at the first closing backtick.
fn assignment_regex(variable: &str) -> Regex {
    let pattern = format!(
        r"(?s)(?:var|let|const)\s+{}\s*=\s*`(.*?)`",
        regex::escape(variable)
    );
    Regex::new(&pattern).expect("escaped variable name always forms a valid pattern")
}

/// Decode JavaScript string-escape sequences in a template-literal body.
///
/// Handles the single-character escapes (`\n \t \r \b \f \v \0`), identity
/// escapes (`\\ \' \" \/ \`` and any other escaped character), `\xHH`,
/// `\uHHHH` including surrogate pairs, `\u{...}`, and line continuations
/// (a backslash immediately followed by a line break).
///
/// # Errors
///
/// Returns an [`EscapeError`] with the byte offset of the offending
/// backslash for truncated hex escapes, lone or unpaired surrogates, and
/// out-of-range code points.
pub fn decode_js_escapes(raw: &str) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, escaped)) = chars.next() else {
            return Err(EscapeError::new(offset, "trailing backslash"));
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'v' => out.push('\u{000B}'),
            '0' => out.push('\0'),
            'x' => {
                let code = take_hex(&mut chars, 2, offset)?;
                let ch = char::from_u32(code)
                    .ok_or_else(|| EscapeError::new(offset, "invalid \\x escape"))?;
                out.push(ch);
            }
            'u' => out.push(decode_unicode_escape(&mut chars, offset)?),
            // Line continuation: backslash-newline contributes nothing.
            '\n' => {}
            '\r' => {
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
            }
            // Identity for everything else, which covers \' \" \\ \/ \` \$
            // the same way a JS engine treats non-escape characters.
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Decode the tail of a `\u` escape: either `\u{...}` or `\uHHHH`, pairing
/// a high surrogate with a following `\uHHHH` low surrogate.
fn decode_unicode_escape(
    chars: &mut Peekable<CharIndices<'_>>,
    offset: usize,
) -> Result<char, EscapeError> {
    if matches!(chars.peek(), Some((_, '{'))) {
        chars.next();
        let mut value: u32 = 0;
        let mut digits = 0;
        loop {
            let Some((_, d)) = chars.next() else {
                return Err(EscapeError::new(offset, "unterminated \\u{...} escape"));
            };
            if d == '}' {
                break;
            }
            let Some(digit) = d.to_digit(16) else {
                return Err(EscapeError::new(offset, format!("non-hex digit `{d}` in \\u{{...}}")));
            };
            value = value.saturating_mul(16).saturating_add(digit);
            digits += 1;
        }
        if digits == 0 {
            return Err(EscapeError::new(offset, "empty \\u{} escape"));
        }
        return char::from_u32(value)
            .ok_or_else(|| EscapeError::new(offset, format!("code point U+{value:X} out of range")));
    }

    let high = take_hex(chars, 4, offset)?;
    if (0xDC00..=0xDFFF).contains(&high) {
        return Err(EscapeError::new(offset, "lone low surrogate"));
    }
    if (0xD800..=0xDBFF).contains(&high) {
        // A high surrogate must be followed by an escaped low surrogate.
        match (chars.next(), chars.next()) {
            (Some((_, '\\')), Some((_, 'u'))) => {
                let low = take_hex(chars, 4, offset)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(EscapeError::new(offset, "unpaired high surrogate"));
                }
                let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(combined).ok_or_else(|| {
                    EscapeError::new(offset, format!("surrogate pair out of range: U+{combined:X}"))
                });
            }
            _ => return Err(EscapeError::new(offset, "unpaired high surrogate")),
        }
    }
    char::from_u32(high)
        .ok_or_else(|| EscapeError::new(offset, format!("code point U+{high:X} out of range")))
}

/// Read exactly `count` hex digits from the iterator.
fn take_hex(
    chars: &mut Peekable<CharIndices<'_>>,
    count: usize,
    offset: usize,
) -> Result<u32, EscapeError> {
    let mut value: u32 = 0;
    for _ in 0..count {
        let Some((_, d)) = chars.next() else {
            return Err(EscapeError::new(offset, "truncated hex escape"));
        };
        let Some(digit) = d.to_digit(16) else {
            return Err(EscapeError::new(offset, format!("non-hex digit `{d}` in escape")));
        };
        value = value * 16 + digit;
    }
    Ok(value)
}
