use std::fmt::Display;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Relative age label for queue entries, measured against the local clock.
pub fn time_ago(date: &str) -> String {
    time_ago_at(date, Local::now())
}

/// Same as [`time_ago`] with an explicit "now". Timestamps without an offset are read in
/// `now`'s time zone, except bare dates which count as UTC midnight.
pub fn time_ago_at<Tz>(date: &str, now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let Some(input) = parse_timestamp(date.trim(), &now.timezone()) else {
        return "Invalid date".to_string();
    };

    let minutes = now.clone().signed_duration_since(input.clone()).num_minutes();
    let hours = minutes / 60;

    if minutes < 1 {
        return "Now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} min{} ago", plural(minutes));
    }
    if hours < 24 {
        return format!("{hours} hr{} ago", plural(hours));
    }

    if input.year() == now.year() {
        input.format("%b %-d, %-I:%M %p").to_string()
    } else {
        input.format("%b %-d, %Y, %-I:%M %p").to_string()
    }
}

fn plural(count: i64) -> &'static str {
    if count > 1 {
        "s"
    } else {
        ""
    }
}

fn parse_timestamp<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(tz));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return tz.from_local_datetime(&naive).earliest();
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).with_timezone(tz))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 9, 20, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn iso(at: DateTime<Utc>) -> String {
        at.to_rfc3339()
    }

    #[test]
    fn under_a_minute_is_now() {
        assert_eq!(time_ago_at(&iso(now() - Duration::seconds(30)), now()), "Now");
    }

    #[test]
    fn future_timestamps_read_as_now() {
        assert_eq!(time_ago_at(&iso(now() + Duration::minutes(5)), now()), "Now");
    }

    #[test]
    fn minutes_and_hours_are_pluralised() {
        assert_eq!(time_ago_at(&iso(now() - Duration::minutes(1)), now()), "1 min ago");
        assert_eq!(time_ago_at(&iso(now() - Duration::minutes(5)), now()), "5 mins ago");
        assert_eq!(time_ago_at(&iso(now() - Duration::hours(1)), now()), "1 hr ago");
        assert_eq!(time_ago_at(&iso(now() - Duration::hours(2)), now()), "2 hrs ago");
    }

    #[test]
    fn naive_timestamps_use_the_clock_zone() {
        assert_eq!(time_ago_at("2025-10-09 19:30", now()), "30 mins ago");
    }

    #[test]
    fn same_year_dates_omit_the_year() {
        assert_eq!(time_ago_at("2025-03-04 07:05", now()), "Mar 4, 7:05 AM");
    }

    #[test]
    fn prior_year_dates_include_the_year() {
        assert_eq!(
            time_ago_at("2024-12-31T18:45:00Z", now()),
            "Dec 31, 2024, 6:45 PM"
        );
    }

    #[test]
    fn garbage_is_an_invalid_date() {
        assert_eq!(time_ago_at("yesterday-ish", now()), "Invalid date");
    }
}
