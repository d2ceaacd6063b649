use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::sections::SectionRow;

static OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)open:\s*(\d+)\s+of\s+\d+\s*left").unwrap());
static WAITLIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)waitlist[:\s]*(\d+)").unwrap());
static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d$").unwrap());

const CLOSED_MARKERS: &[&str] = &["closed", "class full"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "seats", rename_all = "lowercase")]
pub enum StatusVerdict {
    Closed,
    Open(u64),
    Waitlist(u64),
}

/// Reduce pooled section rows to one verdict.
///
/// Precedence: any closed marker, then the largest open-seat count, then the
/// largest waitlist count. Rows with no recognizable status count as closed.
/// Each row contributes the first count it shows.
pub fn classify(rows: &[SectionRow]) -> StatusVerdict {
    if rows.iter().any(|row| is_closed(&row.text)) {
        return StatusVerdict::Closed;
    }
    if let Some(seats) = max_capture(&OPEN_RE, rows) {
        return StatusVerdict::Open(seats);
    }
    if let Some(seats) = max_capture(&WAITLIST_RE, rows) {
        return StatusVerdict::Waitlist(seats);
    }
    StatusVerdict::Closed
}

fn is_closed(text: &str) -> bool {
    let lower = text.to_lowercase();
    CLOSED_MARKERS.iter().any(|m| lower.contains(m))
}

fn max_capture(re: &Regex, rows: &[SectionRow]) -> Option<u64> {
    rows.iter()
        .filter_map(|row| re.captures(&row.text))
        .map(|caps| seat_count(&caps[1]))
        .max()
}

/// Digits matched by `\d` in any script; saturates instead of overflowing.
fn seat_count(digits: &str) -> u64 {
    digits.chars().fold(0u64, |n, c| {
        n.saturating_mul(10).saturating_add(digit_value(c))
    })
}

/// Unicode keeps each script's digits in one contiguous run from zero to
/// nine, so a digit's value is its offset into that run.
fn digit_value(c: char) -> u64 {
    if let Some(d) = c.to_digit(10) {
        return u64::from(d);
    }
    let offset = (1..)
        .map_while(|k| char::from_u32((c as u32).checked_sub(k)?))
        .take_while(|&prev| is_digit(prev))
        .count();
    (offset % 10) as u64
}

fn is_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DIGIT_RE.is_match(c.encode_utf8(&mut buf))
}
