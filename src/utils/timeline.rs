use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Display format for timelines, e.g. `22 Nov 2025, 8:53 pm`.
const DISPLAY_FORMAT: &str = "%-d %b %Y, %-I:%M %P";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub expired: bool,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl TimeRemaining {
    const fn zero(expired: bool) -> Self {
        Self {
            expired,
            days: 0,
            hours: 0,
            minutes: 0,
        }
    }
}

/// Parses a candidate supplied deadline. Naive date-times are taken as UTC.
pub fn parse_timeline_to_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_direct(text).or_else(|| parse_human(text))
}

fn parse_direct(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `<day> <month-name> <year>, <hour>:<minute> <am|pm>`
fn parse_human(text: &str) -> Option<DateTime<Utc>> {
    let normalized = text.replace(',', " ").to_lowercase();
    let mut parts: Vec<&str> = normalized.split_whitespace().collect();

    // "8:53pm" arrives as a single token
    if parts.len() == 4 {
        let clock = parts[3];
        let split_at = clock.len().checked_sub(2)?;
        if !clock.is_char_boundary(split_at) {
            return None;
        }
        let (time, meridiem) = clock.split_at(split_at);
        parts.truncate(3);
        parts.push(time);
        parts.push(meridiem);
    }
    if parts.len() != 5 {
        return None;
    }

    let day: u32 = parts[0].parse().ok()?;
    let month = month_number(parts[1])?;
    let year: i32 = parts[2].parse().ok()?;
    let (hour_raw, minute_raw) = parts[3].split_once(':')?;
    let hour12: u32 = hour_raw.parse().ok()?;
    let minute: u32 = minute_raw.parse().ok()?;
    if !(1..=12).contains(&hour12) {
        return None;
    }
    let hour = match (parts[4], hour12) {
        ("am", 12) => 0,
        ("am", h) => h,
        ("pm", 12) => 12,
        ("pm", h) => h + 12,
        _ => return None,
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?;
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| idx as u32 + 1)
}

pub fn format_timeline(instant: DateTime<Utc>) -> String {
    instant.format(DISPLAY_FORMAT).to_string()
}

pub fn is_timeline_expired(text: &str) -> bool {
    is_timeline_expired_at(text, Utc::now())
}

/// Unparseable timelines never count as expired.
pub fn is_timeline_expired_at(text: &str, now: DateTime<Utc>) -> bool {
    match parse_timeline_to_date(text) {
        Some(deadline) => deadline < now,
        None => false,
    }
}

pub fn get_time_remaining(text: &str) -> TimeRemaining {
    get_time_remaining_at(text, Utc::now())
}

pub fn get_time_remaining_at(text: &str, now: DateTime<Utc>) -> TimeRemaining {
    let Some(deadline) = parse_timeline_to_date(text) else {
        return TimeRemaining::zero(false);
    };
    let diff = deadline - now;
    if diff < chrono::Duration::zero() {
        return TimeRemaining::zero(true);
    }
    let total_minutes = diff.num_minutes();
    TimeRemaining {
        expired: false,
        days: total_minutes / (24 * 60),
        hours: (total_minutes / 60) % 24,
        minutes: total_minutes % 60,
    }
}
