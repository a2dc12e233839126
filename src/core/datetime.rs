//! Date and time parsing for conversational input
//!
//! All user-facing dates use fixed literal formats. Stored timestamps are UTC.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Birth years must have four digits and not precede 1900
//! - 1.0.0: Initial release

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Input format for task due time: `DD.MM.YYYY HH:MM`
pub const DUE_INPUT_FORMAT: &str = "%d.%m.%Y %H:%M";
/// Input format for a birthday with a year: `DD.MM.YYYY`
pub const BIRTH_DATE_FORMAT: &str = "%d.%m.%Y";
/// Earliest accepted birth year
pub const MIN_BIRTH_YEAR: i32 = 1900;
/// Storage format for timestamps (UTC)
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Storage format for calendar dates
pub const DATE_STORAGE_FORMAT: &str = "%Y-%m-%d";

/// A birthday date as entered by the user; the year is optional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDay {
    pub day: u32,
    pub month: u32,
    pub year: Option<i32>,
}

/// Parse a task due time in the user's timezone and convert it to UTC
pub fn parse_due(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), DUE_INPUT_FORMAT)
        .map_err(|_| anyhow!("expected DD.MM.YYYY HH:MM"))?;
    localize(naive, tz).map(|dt| dt.with_timezone(&Utc))
}

/// Resolve a naive wall-clock time in `tz`, choosing the earlier instant on
/// DST overlap and rejecting times skipped by a DST gap
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(anyhow!("{naive} does not exist in {}", tz.name())),
    }
}

/// Parse a birthday as `DD.MM.YYYY` or `DD.MM`
pub fn parse_birth_date(input: &str, today: NaiveDate) -> Result<MonthDay> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, BIRTH_DATE_FORMAT) {
        // chrono's %Y takes any digit count, so "90" would be year 90
        if date.year() < MIN_BIRTH_YEAR {
            return Err(anyhow!("year must be between {MIN_BIRTH_YEAR} and {}", today.year()));
        }
        if date > today {
            return Err(anyhow!("birth date is in the future"));
        }
        return Ok(MonthDay {
            day: date.day(),
            month: date.month(),
            year: Some(date.year()),
        });
    }

    let (day, month) = input
        .split_once('.')
        .ok_or_else(|| anyhow!("expected DD.MM.YYYY or DD.MM"))?;
    let day: u32 = day.parse().map_err(|_| anyhow!("invalid day"))?;
    let month: u32 = month.parse().map_err(|_| anyhow!("invalid month"))?;

    // 2000 is a leap year, so 29.02 is accepted without a year
    if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
        return Err(anyhow!("{day:02}.{month:02} is not a calendar date"));
    }

    Ok(MonthDay {
        day,
        month,
        year: None,
    })
}

/// The date on which a month/day falls in `year`; 29 Feb maps to 28 Feb
/// in non-leap years
pub fn occurrence_in_year(day: u32, month: u32, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| {
        if month == 2 && day == 29 {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}

/// Next occurrence of a month/day on or after `today`
pub fn next_occurrence(day: u32, month: u32, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = occurrence_in_year(day, month, today.year())?;
    if this_year >= today {
        Some(this_year)
    } else {
        occurrence_in_year(day, month, today.year() + 1)
    }
}

/// Days from `today` until the next occurrence of the month/day
pub fn days_until(day: u32, month: u32, today: NaiveDate) -> Option<i64> {
    next_occurrence(day, month, today).map(|next| (next - today).num_days())
}

/// Parse a timestamp in [`STORAGE_FORMAT`] as UTC
pub fn parse_stored(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, STORAGE_FORMAT)
        .map_err(|e| anyhow!("invalid stored timestamp '{value}': {e}"))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Format a UTC timestamp for storage
pub fn format_stored(value: DateTime<Utc>) -> String {
    value.format(STORAGE_FORMAT).to_string()
}

/// Short human-readable time left until `due`, e.g. `2d`, `5h`, `12m`
pub fn format_time_left(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = due - now;
    if left < Duration::zero() {
        "overdue".to_string()
    } else if left.num_days() > 0 {
        format!("{}d", left.num_days())
    } else if left.num_hours() > 0 {
        format!("{}h", left.num_hours())
    } else {
        format!("{}m", left.num_minutes())
    }
}

/// Format a UTC timestamp in the given timezone as `DD.MM.YYYY HH:MM`
pub fn format_local(value: DateTime<Utc>, tz: Tz) -> String {
    value.with_timezone(&tz).format(DUE_INPUT_FORMAT).to_string()
}

/// Parse an IANA timezone name
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}
