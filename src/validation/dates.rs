//! Form date parsing and client timezone normalization.
//!
//! Browsers submit dates as wall-clock literals (`2024-05-01` or
//! `2024-05-01T14:30`) with no zone. The client also posts its offset in
//! minutes using the `Date.getTimezoneOffset` convention: UTC minus local
//! time, so a zone ahead of UTC reports a negative value. A literal is
//! pinned to the client's zone by appending the designator for that
//! offset (300 becomes `-05:00`, -330 becomes `+05:30`) and parsing the
//! resulting RFC 3339 string as an absolute instant.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::{AppError, AppResult};

/// Largest offset a zone designator can express
pub const MAX_OFFSET_MINUTES: i32 = 24 * 60 - 1;

const WALL_CLOCK_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// A parsed form date, before or after zone resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormDate {
    /// Wall-clock value with no zone information
    Local(NaiveDateTime),
    /// Value that already carries an explicit offset
    Zoned(DateTime<FixedOffset>),
}

/// Parse an ISO 8601 form value. Date-only values mean local midnight.
pub fn parse_form_date(value: &str) -> Option<FormDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(zoned) = DateTime::parse_from_rfc3339(value) {
        return Some(FormDate::Zoned(zoned));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(FormDate::Local);
    }

    WALL_CLOCK_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(FormDate::Local)
}

/// Zone designator for a client offset. Positive offsets (west of UTC)
/// render with a negative sign; zero renders as `+00:00`.
pub fn zone_designator(tz_offset: i32) -> String {
    let sign = if tz_offset > 0 { '-' } else { '+' };
    let minutes = tz_offset.unsigned_abs();
    format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// ISO 8601 text of a wall-clock value pinned to the client's zone
pub fn localized_iso(wall: NaiveDateTime, tz_offset: i32) -> String {
    format!(
        "{}{}",
        wall.format("%Y-%m-%dT%H:%M:%S%.3f"),
        zone_designator(tz_offset)
    )
}

/// Reinterpret a wall-clock value as having occurred in the client's zone
pub fn localize(wall: NaiveDateTime, tz_offset: i32) -> AppResult<DateTime<FixedOffset>> {
    if tz_offset.abs() > MAX_OFFSET_MINUTES {
        return Err(AppError::BadRequest(format!(
            "tzoffset {} is outside +/-{} minutes",
            tz_offset, MAX_OFFSET_MINUTES
        )));
    }
    let iso = localized_iso(wall, tz_offset);
    DateTime::parse_from_rfc3339(&iso)
        .map_err(|e| AppError::Internal(format!("cannot parse localized date {}: {}", iso, e)))
}
