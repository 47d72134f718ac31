use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

use super::MealsError;

/// User guidance listing the accepted ready-time formats.
pub const ACCEPTED_TIME_FORMATS: &str =
    "'17:00', '17:00:00', '2022-12-31T17:00:00Z', or '2022-12-31T17:00'";

/// Parse a ready time, trying in order: `HH:MM`, `HH:MM:SS`, a full ISO-8601
/// timestamp, then `YYYY-MM-DDTHH:MM`. Bare times fall on `today`.
///
/// Timestamps carrying an offset keep their wall-clock time in that offset.
pub fn parse_ready_time(input: &str, today: NaiveDate) -> Result<NaiveDateTime, MealsError> {
    let raw = input.trim();

    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M") {
        return Ok(today.and_time(time));
    }
    if let Ok(time) = NaiveTime::parse_from_str(raw, "%H:%M:%S") {
        return Ok(today.and_time(time));
    }

    let iso = normalize_iso(raw);
    if let Ok(ts) = DateTime::parse_from_rfc3339(&iso) {
        return Ok(ts.naive_local());
    }
    if let Ok(ts) = DateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M%:z") {
        return Ok(ts.naive_local());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M") {
        return Ok(ts);
    }

    Err(MealsError::MalformedTimeInput {
        input: input.to_string(),
    })
}

/// Accept a space between date and time, and `Z` for UTC.
fn normalize_iso(raw: &str) -> String {
    let mut iso = raw.to_string();
    if iso.len() > 10 && iso.as_bytes()[10] == b' ' {
        iso.replace_range(10..11, "T");
    }
    let utc = iso
        .strip_suffix(|c: char| c == 'Z' || c == 'z')
        .map(|ts| format!("{ts}+00:00"));
    if let Some(utc) = utc {
        iso = utc;
    }
    iso
}

/// `parse_ready_time` against the current local date.
pub fn parse_ready_time_today(input: &str) -> Result<NaiveDateTime, MealsError> {
    parse_ready_time(input, Local::now().date_naive())
}
