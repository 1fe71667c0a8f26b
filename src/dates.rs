//! Calendar arithmetic and the fixed-width text forms used for dates
//! (`YYYY-MM-DD`) and times (`HH:MM`, 24h).

use chrono::{Datelike, Duration, Month, Months, NaiveDate, NaiveTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Parse an ISO calendar date. Only the zero-padded ten character form is
/// accepted so stored text and parsed values stay interchangeable.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Parse a `HH:MM` time of day.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(raw, TIME_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Sunday through Saturday of the week containing `today`, both inclusive.
/// `None` when the week runs past chrono's date range.
pub fn week_bounds(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let offset = i64::from(today.weekday().num_days_from_sunday());
    let start = today.checked_sub_signed(Duration::days(offset))?;
    let end = start.checked_add_signed(Duration::days(6))?;
    Some((start, end))
}

/// First and last day of the given month, or `None` when `month` is not in
/// `1..=12` or the year is out of chrono's range.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some((first, last))
}

/// Move `delta` months forward (or backward when negative).
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// English month name, e.g. `July`. Falls back to the number for bad input.
pub fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| month.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).unwrap()
    }

    #[test]
    fn rejects_non_padded_or_garbage_input() {
        assert!(parse_date("2024-6-1").is_none());
        assert!(parse_date("2024-02-30").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_time("9:00").is_none());
        assert!(parse_time("24:00").is_none());
        assert_eq!(format_time(parse_time("09:05").unwrap()), "09:05");
    }

    #[test]
    fn week_of_a_wednesday_runs_sunday_to_saturday() {
        assert_eq!(
            week_bounds(date("2024-06-12")),
            Some((date("2024-06-09"), date("2024-06-15")))
        );
    }

    #[test]
    fn week_bounds_on_sunday_and_saturday() {
        assert_eq!(
            week_bounds(date("2024-06-09")),
            Some((date("2024-06-09"), date("2024-06-15")))
        );
        assert_eq!(
            week_bounds(date("2024-06-15")),
            Some((date("2024-06-09"), date("2024-06-15")))
        );
    }

    #[test]
    fn week_past_the_calendar_edge_has_no_bounds() {
        assert!(week_bounds(NaiveDate::MAX).is_none());
    }

    #[test]
    fn february_length_follows_leap_years() {
        assert_eq!(month_bounds(2024, 2).unwrap().1, date("2024-02-29"));
        assert_eq!(month_bounds(2023, 2).unwrap().1, date("2023-02-28"));
        assert_eq!(month_bounds(2024, 12).unwrap().1, date("2024-12-31"));
        assert!(month_bounds(2024, 13).is_none());
    }

    #[test]
    fn shift_month_wraps_years() {
        assert_eq!(shift_month(2024, 1, -1), (2023, 12));
        assert_eq!(shift_month(2024, 12, 1), (2025, 1));
        assert_eq!(shift_month(2024, 7, 0), (2024, 7));
        assert_eq!(month_name(7), "July");
    }
}
