//! Human-readable timestamps for listings, offers, and chat.
//!
//! Every function is pure: the caller passes `now`, and all calendar math is in UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// `"just now"`, `"5 minutes ago"`, `"1 week ago"`, ...
///
/// Months are 30 days and years 365 days. Dates after `now` read as `"just now"`.
#[must_use]
pub fn format_relative(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - date).num_seconds();
    if seconds < MINUTE {
        return "just now".to_owned();
    }

    let minutes = seconds / MINUTE;
    if minutes < 60 {
        return ago(minutes, "minute");
    }

    let hours = seconds / HOUR;
    if hours < 24 {
        return ago(hours, "hour");
    }

    let days = seconds / DAY;
    if days < 7 {
        return ago(days, "day");
    }

    let weeks = days / 7;
    if weeks < 4 {
        return ago(weeks, "week");
    }

    let months = days / 30;
    if months < 12 {
        return ago(months, "month");
    }

    ago(days / 365, "year")
}

fn ago(n: i64, unit: &str) -> String {
    if n == 1 { format!("1 {unit} ago") } else { format!("{n} {unit}s ago") }
}

/// `Jan 15, 2024`
#[must_use]
pub fn format_short_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// `January 15, 2024`
#[must_use]
pub fn format_long_date(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// `3:30 PM`
#[must_use]
pub fn format_time(date: DateTime<Utc>) -> String {
    date.format("%-I:%M %p").to_string()
}

/// `Jan 15, 2024 at 3:30 PM`
#[must_use]
pub fn format_date_time(date: DateTime<Utc>) -> String {
    format!("{} at {}", format_short_date(date), format_time(date))
}

/// RFC 3339 with milliseconds and a `Z` suffix, as the API expects.
#[must_use]
pub fn format_iso(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[must_use]
pub fn is_today(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    date.date_naive() == now.date_naive()
}

#[must_use]
pub fn is_yesterday(date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.date_naive().pred_opt() == Some(date.date_naive())
}

/// `Today at 3:30 PM`, `Yesterday at 3:30 PM`, or [`format_date_time`].
#[must_use]
pub fn readable_date(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if is_today(date, now) {
        format!("Today at {}", format_time(date))
    } else if is_yesterday(date, now) {
        format!("Yesterday at {}", format_time(date))
    } else {
        format_date_time(date)
    }
}

/// Parses a backend timestamp.
///
/// Accepts RFC 3339, and zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` read as UTC.
/// Blank or unparseable input yields `None`.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|n| n.and_utc())
    })
}
