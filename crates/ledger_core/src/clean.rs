use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use crate::dates::parse_instant;

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{1,2}):(\d{1,2})").expect("clock pattern"));

/// Keep only ASCII digits and the first `.` of a display value.
///
/// `"1,234.5 Ether"` becomes `"1234.5"`; text without digits becomes `""`.
pub fn strip_non_numeric(raw: &str) -> String {
    let mut seen_dot = false;
    raw.chars()
        .filter(|c| match c {
            '0'..='9' => true,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            _ => false,
        })
        .collect()
}

/// Normalize an explorer date value.
///
/// A clock substring (`H:M:S`, one or two digits each) is zero-padded in
/// place and the label is then parsed as an instant. Otherwise a positive
/// integer is read as Unix seconds. Either way the result is an ISO-8601 UTC
/// instant with millisecond precision. Anything that does not parse is
/// `None`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(caps) = CLOCK.captures(raw) {
        let whole = caps.get(0)?;
        let mut out = String::with_capacity(raw.len() + 3);
        out.push_str(&raw[..whole.start()]);
        out.push_str(&format!(
            "{:0>2}:{:0>2}:{:0>2}",
            &caps[1], &caps[2], &caps[3]
        ));
        out.push_str(&raw[whole.end()..]);
        return parse_instant(&out).map(iso);
    }

    match raw.parse::<i64>() {
        Ok(seconds) if seconds > 0 => DateTime::from_timestamp(seconds, 0).map(iso),
        _ => None,
    }
}

fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// True when `value` is made of digits with at most one `.`.
pub fn is_clean_numeric(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_digit() || c == '.')
        && value.chars().filter(|c| *c == '.').count() <= 1
}
