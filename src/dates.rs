//! Date resolution for free-text menu labels.
//!
//! Menu entries carry dates only as display titles ("Monday, March 3, 2025",
//! "Lunch 3/3/25", sometimes with escaped slashes, sometimes with no date at
//! all). This module turns such a label into a canonical [`NaiveDate`] plus a
//! weekday string using a prioritized set of pattern matchers:
//!
//! 1. A whole-word weekday name anywhere in the label is taken verbatim.
//! 2. `Month DD, YYYY` (full or abbreviated month name).
//! 3. Numeric `MM/DD/YY` or `MM/DD/YYYY`; slashes may be backslash-escaped
//!    (they survive double-encoding upstream); two-digit years map to `20yy`.
//! 4. If a weekday was not found in the text but a date resolved, the
//!    weekday is derived from the date.
//!
//! A matched pattern that is semantically invalid (month 13, day 45) counts
//! as a non-match and control falls through to the next heuristic. Nothing
//! here ever fails: an unresolvable label yields an absent date and an empty
//! weekday, which is a valid terminal state for the caller.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static WEEKDAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)\b").unwrap()
});

static MONTH_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z]+)\s+(\d{1,2}),\s*(\d{4})").unwrap());

static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})[\\/]+(\d{1,2})[\\/]+(\d{2,4})").unwrap());

/// The outcome of resolving a free-text label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    /// Canonical date, absent when no pattern matched.
    pub date: Option<NaiveDate>,
    /// Weekday label: verbatim from the text if present there, otherwise
    /// derived from `date`, otherwise empty.
    pub weekday: String,
}

/// Resolve a canonical date and weekday from a free-text label.
///
/// First match wins for the date component; parse failures fall through to
/// the remaining heuristics rather than propagating.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(resolve("3/3/25").date, NaiveDate::from_ymd_opt(2025, 3, 3));
/// assert_eq!(resolve("Specials").weekday, "");
/// ```
pub fn resolve(label: &str) -> ResolvedDate {
    let mut weekday = WEEKDAY
        .find(label)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let date = try_month_name(label).or_else(|| try_numeric(label));

    if weekday.is_empty() {
        if let Some(date) = date {
            // %A is chrono's English weekday name, independent of locale.
            weekday = date.format("%A").to_string();
        }
    }

    ResolvedDate { date, weekday }
}

/// `Month DD, YYYY` with a full or abbreviated month name; chrono's `%B`
/// accepts both when parsing. A word that is not a month name fails the
/// parse and counts as no match.
fn try_month_name(label: &str) -> Option<NaiveDate> {
    let caps = MONTH_NAME.captures(label)?;
    let assembled = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&assembled, "%B %d %Y").ok()
}

/// Numeric `MM/DD/YY[YY]`, tolerating backslash-escaped separators.
fn try_numeric(label: &str) -> Option<NaiveDate> {
    let caps = NUMERIC.captures(label)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year_text = &caps[3];
    let mut year: i32 = year_text.parse().ok()?;
    if year_text.len() == 2 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
