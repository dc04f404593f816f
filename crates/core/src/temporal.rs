//! Date and time parsing for heterogeneous spreadsheet exports.
//!
//! Tabular exports encode temporal values every way imaginable: ISO dates,
//! day-first regional dates, named-month dates, 12/24-hour clocks, and raw
//! spreadsheet serials (days since an epoch anchor, with time-of-day as a
//! fraction of 24 hours). This module parses all of them into a canonical
//! `NaiveDate` plus a UTC instant.

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Serial-day numbers at or above this bound are rejected as noise rather
/// than mapped to far-future dates (200 000 days past the epoch lands in
/// the 25th century).
const SERIAL_DAY_MAX: f64 = 200_000.0;

/// Upper bound of the fractional-day window accepted by [`parse_time`].
///
/// Fractions in `[1.0, 1.5)` are tolerated because datetime serials with a
/// whole-number date component sometimes leak into time-only columns. This
/// is a heuristic accommodation, not a guarantee; such values roll the
/// composed date forward by one day.
const TIME_FRACTION_MAX: f64 = 1.5;

/// Date formats tried in order after the serial-day check. Day-first
/// regional formats take precedence over ISO.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Datetime formats recognized by [`parse_timestamp`] before falling back
/// to date-only parsing.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Epoch anchor for spreadsheet serial-day numbers. Day 1 is 1899-12-31;
/// anchoring two days before 1900-01-01 absorbs the fictitious 1900 leap
/// day carried by spreadsheet formats.
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("static epoch date")
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Convert a spreadsheet serial-day number to a calendar date.
///
/// The fractional part (time-of-day) is truncated; callers that need it use
/// [`parse_timestamp`] or [`parse_time`].
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= 0.0 || serial >= SERIAL_DAY_MAX {
        return None;
    }
    serial_epoch().checked_add_days(Days::new(serial.trunc() as u64))
}

/// Parse a date from any recognized encoding.
///
/// Trial order: serial-day number, day-first `d/m/Y` (also `-` separated),
/// ISO-like `Y-m-d` (also `/`), then day-MonthName-year. First match wins;
/// unrecognized text yields `None`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(serial) = trimmed.parse::<f64>() {
        return date_from_serial(serial);
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(parsed);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Times
// ---------------------------------------------------------------------------

/// A parsed time of day.
///
/// `hours` may exceed 23 when the source was a fractional-day serial in the
/// tolerated `[1.0, 1.5)` window; composition rolls the excess into the
/// following day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ClockTime {
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.hours) * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

/// Parse a time of day from `HH:MM[:SS][ AM|PM]` text or a bare
/// fractional-day serial (`0.5` is 12:00:00), rounded to the nearest
/// second.
pub fn parse_time(text: &str) -> Option<ClockTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(fraction) = trimmed.parse::<f64>() {
        return time_from_fraction(fraction);
    }
    clock_from_text(trimmed)
}

fn time_from_fraction(fraction: f64) -> Option<ClockTime> {
    if !fraction.is_finite() || fraction < 0.0 || fraction >= TIME_FRACTION_MAX {
        return None;
    }
    let total = (fraction * 86_400.0).round() as u64;
    Some(ClockTime {
        hours: (total / 3600) as u32,
        minutes: ((total % 3600) / 60) as u32,
        seconds: (total % 60) as u32,
    })
}

fn clock_from_text(text: &str) -> Option<ClockTime> {
    const CLOCK_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];
    let upper = text.to_ascii_uppercase();
    for fmt in CLOCK_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(&upper, fmt) {
            return Some(ClockTime {
                hours: t.hour(),
                minutes: t.minute(),
                seconds: t.second(),
            });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Compose separate date and time cells into the canonical pair: a calendar
/// date plus a full UTC instant.
///
/// An absent or unparsable time leaves the date at midnight. An unparsable
/// date falls back to the current instant. The reported date is derived
/// from the composed instant, so hour values past 23 (tolerated fractional
/// serials) move both forward consistently.
pub fn parse_date_time(
    date_text: Option<&str>,
    time_text: Option<&str>,
) -> (NaiveDate, DateTime<Utc>) {
    let date = date_text.and_then(parse_date);
    let time = time_text.and_then(parse_time);
    match date {
        Some(d) => {
            let midnight = Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).expect("midnight"));
            let offset = time
                .map(|t| Duration::seconds(t.total_seconds() as i64))
                .unwrap_or_else(Duration::zero);
            let instant = midnight + offset;
            (instant.date_naive(), instant)
        }
        None => {
            let now = Utc::now();
            (now.date_naive(), now)
        }
    }
}

/// Parse a single cell holding a full timestamp.
///
/// Tries RFC 3339, the combined [`DATETIME_FORMATS`], a serial number with
/// day and fraction, and finally any bare date (anchored at midnight UTC).
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    if let Ok(serial) = trimmed.parse::<f64>() {
        let date = date_from_serial(serial)?;
        let seconds = (serial.fract() * 86_400.0).round() as i64;
        let midnight = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight"));
        return Some(midnight + Duration::seconds(seconds));
    }
    parse_date(trimmed)
        .map(|d| Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).expect("midnight")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // -- parse_date -----------------------------------------------------------

    #[test]
    fn day_first_slash_date() {
        assert_eq!(parse_date("21/09/2024"), Some(date(2024, 9, 21)));
    }

    #[test]
    fn day_first_dash_date() {
        assert_eq!(parse_date("21-09-2024"), Some(date(2024, 9, 21)));
    }

    #[test]
    fn iso_date() {
        assert_eq!(parse_date("2024-09-21"), Some(date(2024, 9, 21)));
        assert_eq!(parse_date("2024/09/21"), Some(date(2024, 9, 21)));
    }

    #[test]
    fn named_month_date() {
        assert_eq!(parse_date("22-Feb-2024"), Some(date(2024, 2, 22)));
        assert_eq!(parse_date("22-February-2024"), Some(date(2024, 2, 22)));
        assert_eq!(parse_date("22 Feb 2024"), Some(date(2024, 2, 22)));
    }

    #[test]
    fn serial_day_45000() {
        // 1899-12-30 + 45 000 days.
        assert_eq!(parse_date("45000"), Some(date(2023, 3, 15)));
    }

    #[test]
    fn serial_day_with_fraction_truncates() {
        assert_eq!(parse_date("45000.75"), Some(date(2023, 3, 15)));
    }

    #[test]
    fn serial_out_of_range_rejected() {
        assert_eq!(parse_date("0"), None);
        assert_eq!(parse_date("-3"), None);
        assert_eq!(parse_date("2000000"), None);
    }

    #[test]
    fn unparsable_date_is_none() {
        assert_eq!(parse_date("next tuesday"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
    }

    // -- parse_time -----------------------------------------------------------

    #[test]
    fn twenty_four_hour_clock() {
        assert_eq!(
            parse_time("14:30"),
            Some(ClockTime { hours: 14, minutes: 30, seconds: 0 })
        );
        assert_eq!(
            parse_time("14:30:45"),
            Some(ClockTime { hours: 14, minutes: 30, seconds: 45 })
        );
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(
            parse_time("2:30 PM"),
            Some(ClockTime { hours: 14, minutes: 30, seconds: 0 })
        );
        assert_eq!(
            parse_time("12:00 am"),
            Some(ClockTime { hours: 0, minutes: 0, seconds: 0 })
        );
    }

    #[test]
    fn half_day_fraction_is_noon() {
        assert_eq!(
            parse_time("0.5"),
            Some(ClockTime { hours: 12, minutes: 0, seconds: 0 })
        );
    }

    #[test]
    fn fraction_rounds_to_nearest_second() {
        // 0.000011574 days ≈ 1.0000 s.
        assert_eq!(
            parse_time("0.000011574"),
            Some(ClockTime { hours: 0, minutes: 0, seconds: 1 })
        );
    }

    #[test]
    fn fraction_above_one_day_is_tolerated() {
        // Heuristic window: values in [1.0, 1.5) are accepted as a day plus
        // a fraction. This pins the current behavior; it is not a contract.
        assert_eq!(
            parse_time("1.25"),
            Some(ClockTime { hours: 30, minutes: 0, seconds: 0 })
        );
    }

    #[test]
    fn fraction_at_or_past_window_rejected() {
        assert_eq!(parse_time("1.5"), None);
        assert_eq!(parse_time("2.0"), None);
        assert_eq!(parse_time("-0.1"), None);
    }

    // -- parse_date_time ------------------------------------------------------

    #[test]
    fn compose_date_and_time() {
        let (d, ts) = parse_date_time(Some("21/09/2024"), Some("14:30"));
        assert_eq!(d, date(2024, 9, 21));
        assert_eq!(ts.to_rfc3339(), "2024-09-21T14:30:00+00:00");
    }

    #[test]
    fn missing_time_stays_midnight() {
        let (_, ts) = parse_date_time(Some("2024-09-21"), None);
        assert_eq!(ts.to_rfc3339(), "2024-09-21T00:00:00+00:00");
    }

    #[test]
    fn overflow_time_rolls_date_forward() {
        // 1.25 days of time-of-day on 2024-09-21 lands at 06:00 the next
        // day. Pins the tolerated-window behavior; not authoritative.
        let (d, ts) = parse_date_time(Some("21/09/2024"), Some("1.25"));
        assert_eq!(d, date(2024, 9, 22));
        assert_eq!(ts.to_rfc3339(), "2024-09-22T06:00:00+00:00");
    }

    #[test]
    fn unparsable_date_falls_back_to_now() {
        let before = Utc::now();
        let (_, ts) = parse_date_time(Some("garbage"), None);
        let after = Utc::now();
        assert!(ts >= before && ts <= after);
    }

    // -- parse_timestamp ------------------------------------------------------

    #[test]
    fn timestamp_from_rfc3339() {
        let ts = parse_timestamp("2024-09-21T14:30:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-09-21T14:30:00+00:00");
    }

    #[test]
    fn timestamp_from_combined_text() {
        let ts = parse_timestamp("21/09/2024 14:30").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-09-21T14:30:00+00:00");
    }

    #[test]
    fn timestamp_from_serial_with_fraction() {
        let ts = parse_timestamp("45000.5").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-03-15T12:00:00+00:00");
    }

    #[test]
    fn timestamp_from_bare_date_is_midnight() {
        let ts = parse_timestamp("22-Feb-2024").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-02-22T00:00:00+00:00");
    }

    #[test]
    fn timestamp_unparsable_is_none() {
        assert_eq!(parse_timestamp("whenever"), None);
    }
}
