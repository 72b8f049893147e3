use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a server timestamp as a local calendar date, e.g. "Mar 12, 2024"
pub fn format_date(date: &DateTime<Utc>) -> String {
    format_date_in(date, &Local)
}

/// Format a server timestamp as a calendar date in `tz`
pub fn format_date_in<Tz: TimeZone>(date: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    date.with_timezone(tz).format("%b %d, %Y").to_string()
}
