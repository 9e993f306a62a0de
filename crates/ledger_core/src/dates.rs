use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::ConfigError;

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+) (second|minute|hour|day|week|month|year)s?$")
        .expect("relative date pattern")
});

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%b-%d-%Y %I:%M:%S %p"];

/// Parse the date shapes produced by the normalizers and accepted as
/// absolute range bounds. Naive values are taken as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }

    // Explorer labels such as "Mar-04-2021 05:06:07 AM +UTC".
    let raw = raw
        .trim_end_matches("+UTC")
        .trim_end_matches("UTC")
        .trim_end();
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Resolve a range bound against `now`.
///
/// Accepts `today`, `yesterday` (both at UTC midnight), `"N unit(s)"` meaning
/// N units before `now`, or an absolute instant.
pub fn resolve_bound(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, ConfigError> {
    let trimmed = raw.trim();
    let invalid = || ConfigError::InvalidDate(raw.to_string());

    if trimmed.eq_ignore_ascii_case("today") || trimmed.eq_ignore_ascii_case("yesterday") {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?
            .and_utc();
        return Ok(if trimmed.eq_ignore_ascii_case("today") {
            midnight
        } else {
            midnight - Duration::days(1)
        });
    }

    if let Some(caps) = RELATIVE.captures(trimmed) {
        let amount: u32 = caps[1].parse().map_err(|_| invalid())?;
        if amount > 0 {
            let unit = caps[2].to_ascii_lowercase();
            let resolved = match unit.as_str() {
                "second" => now.checked_sub_signed(Duration::seconds(amount.into())),
                "minute" => now.checked_sub_signed(Duration::minutes(amount.into())),
                "hour" => now.checked_sub_signed(Duration::hours(amount.into())),
                "day" => now.checked_sub_signed(Duration::days(amount.into())),
                "week" => now.checked_sub_signed(Duration::weeks(amount.into())),
                "month" => now.checked_sub_months(Months::new(amount)),
                "year" => amount
                    .checked_mul(12)
                    .and_then(|months| now.checked_sub_months(Months::new(months))),
                _ => None,
            };
            return resolved.ok_or_else(invalid);
        }
    }

    parse_instant(trimmed).ok_or_else(invalid)
}

/// Inclusive `[min, max]` window; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Resolve both bounds once. Empty strings leave a side open.
    pub fn resolve(
        min: Option<&str>,
        max: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        let resolve = |value: Option<&str>| -> Result<Option<DateTime<Utc>>, ConfigError> {
            match value.map(str::trim).filter(|v| !v.is_empty()) {
                Some(v) => resolve_bound(v, now).map(Some),
                None => Ok(None),
            }
        };
        Self::new(resolve(min)?, resolve(max)?)
    }

    pub fn new(
        min: Option<DateTime<Utc>>,
        max: Option<DateTime<Utc>>,
    ) -> Result<Self, ConfigError> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if hi < lo {
                return Err(ConfigError::InvalidRange {
                    min: lo.to_rfc3339(),
                    max: hi.to_rfc3339(),
                });
            }
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Option<DateTime<Utc>> {
        self.min
    }

    pub fn max(&self) -> Option<DateTime<Utc>> {
        self.max
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.min.is_none_or(|lo| lo <= instant) && self.max.is_none_or(|hi| instant <= hi)
    }

    /// Records without a date always pass. A date that cannot be parsed only
    /// passes an unbounded range.
    pub fn admits(&self, date: Option<&str>) -> bool {
        match date {
            None => true,
            Some(raw) => match parse_instant(raw) {
                Some(instant) => self.contains(instant),
                None => self.is_unbounded(),
            },
        }
    }
}
