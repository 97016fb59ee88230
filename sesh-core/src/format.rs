//! Formatting helpers shared by the report and the CLI.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Format milliseconds as "HHh MMm SSs" (e.g., "03h 07m 09s").
///
/// Hours are not wrapped at 24, so long totals read "312h 45m 00s".
pub fn format_duration_hms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}h {:02}m {:02}s", hours, mins, secs)
}

/// Format milliseconds compactly (e.g., "312h 45m", "7m").
pub fn format_duration_short(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

/// Format a large count for display (e.g., "14.2K").
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// "Mar 15, 2024"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// "March 2024"
pub fn format_month(year: i32, month: u32) -> String {
    format!("{} {}", month_name(month), year)
}

/// Monday-to-Sunday span of an ISO week (e.g., "Mar 11 - Mar 17, 2024").
pub fn format_iso_week(iso_year: i32, week: u32) -> String {
    match NaiveDate::from_isoywd_opt(iso_year, week, Weekday::Mon) {
        Some(start) => {
            let end = start + Duration::days(6);
            format!("{} - {}", start.format("%b %d"), end.format("%b %d, %Y"))
        }
        None => format!("{}-W{:02}", iso_year, week),
    }
}

/// 12-hour clock label for an hour of day (e.g., "3PM", "12AM").
pub fn format_hour(hour: u32) -> String {
    let h = hour % 12;
    let h = if h == 0 { 12 } else { h };
    let suffix = if hour % 24 < 12 { "AM" } else { "PM" };
    format!("{}{}", h, suffix)
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Weekday name from a Monday-first index.
pub fn weekday_name(index: usize) -> &'static str {
    match index {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        6 => "Sunday",
        _ => "Unknown",
    }
}

/// ISO week key of a date.
pub fn iso_week_of(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_hms() {
        assert_eq!(format_duration_hms(0), "00h 00m 00s");
        assert_eq!(format_duration_hms(11_229_999), "03h 07m 09s");
        assert_eq!(format_duration_hms(312 * 3_600_000), "312h 00m 00s");
    }

    #[test]
    fn test_duration_short() {
        assert_eq!(format_duration_short(420_000), "7m");
        assert_eq!(
            format_duration_short((312 * 3600 + 45 * 60) * 1000),
            "312h 45m"
        );
    }

    #[test]
    fn test_count_display() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(14_200), "14.2K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_hour_display() {
        assert_eq!(format_hour(0), "12AM");
        assert_eq!(format_hour(11), "11AM");
        assert_eq!(format_hour(12), "12PM");
        assert_eq!(format_hour(15), "3PM");
    }

    #[test]
    fn test_week_display() {
        assert_eq!(format_iso_week(2024, 11), "Mar 11 - Mar 17, 2024");
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(iso_week_of(date), (2024, 11));
        assert_eq!(format_date(date), "Mar 15, 2024");
        assert_eq!(format_month(2024, 3), "March 2024");
    }
}
