//! Timetable time handling.
//!
//! Feeds provide stop times as "HH:MM:SS" clock strings, with hours past 23
//! allowed for services that run past midnight. Internally every stop time is
//! a time of day plus a "days after trip start" counter, so the calendar
//! instant of any call is unambiguous once the trip's service date is known.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

/// Error returned when parsing an invalid clock string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Parse a clock time from "HH:MM" or "HH:MM:SS".
///
/// Hours 24..=47 are folded back onto the clock; the day rollover is
/// recovered later from the ordering of consecutive stop times.
///
/// # Examples
///
/// ```
/// use journey_router::domain::parse_clock;
/// use chrono::NaiveTime;
///
/// assert_eq!(
///     parse_clock("08:05").unwrap(),
///     NaiveTime::from_hms_opt(8, 5, 0).unwrap()
/// );
/// assert_eq!(
///     parse_clock("25:10:30").unwrap(),
///     NaiveTime::from_hms_opt(1, 10, 30).unwrap()
/// );
/// assert!(parse_clock("8:05").is_err());
/// assert!(parse_clock("08:60").is_err());
/// ```
pub fn parse_clock(s: &str) -> Result<NaiveTime, TimeError> {
    let bytes = s.as_bytes();
    if bytes.len() != 5 && bytes.len() != 8 {
        return Err(TimeError::new("expected HH:MM or HH:MM:SS format"));
    }
    if bytes[2] != b':' || (bytes.len() == 8 && bytes[5] != b':') {
        return Err(TimeError::new("expected colon separators"));
    }

    let hour =
        parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
    if hour > 47 {
        return Err(TimeError::new("hour must be 0-47"));
    }
    let minute =
        parse_two_digits(&bytes[3..5]).ok_or_else(|| TimeError::new("invalid minute digits"))?;
    if minute > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }
    let second = if bytes.len() == 8 {
        let second = parse_two_digits(&bytes[6..8])
            .ok_or_else(|| TimeError::new("invalid second digits"))?;
        if second > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }
        second
    } else {
        0
    };

    NaiveTime::from_hms_opt(hour % 24, minute, second).ok_or_else(|| TimeError::new("invalid time"))
}

fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return None;
    }
    Some(u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0'))
}

/// Shift an instant by a signed number of seconds, saturating at the
/// representable bounds.
///
/// The search uses `NaiveDateTime::MAX`/`MIN` as "never reached" sentinels,
/// so arithmetic on them must not overflow.
pub fn shift(t: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    match t.checked_add_signed(Duration::seconds(seconds)) {
        Some(shifted) => shifted,
        None if seconds >= 0 => NaiveDateTime::MAX,
        None => NaiveDateTime::MIN,
    }
}

/// Drop the seconds of an instant.
pub fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// A single call of a trip at a stop.
///
/// Times are clock times; the day counters say how many days after the trip's
/// service date each of them falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopTime {
    pub arrival: NaiveTime,
    pub departure: NaiveTime,
    pub arrival_day: u8,
    pub departure_day: u8,
}

impl StopTime {
    /// Arrival instant for a trip running on `service_date`.
    pub fn arrival_at(&self, service_date: NaiveDate) -> NaiveDateTime {
        at_day_offset(service_date, self.arrival_day, self.arrival)
    }

    /// Departure instant for a trip running on `service_date`.
    pub fn departure_at(&self, service_date: NaiveDate) -> NaiveDateTime {
        at_day_offset(service_date, self.departure_day, self.departure)
    }

    /// Seconds since the start of the service date, counting day rollovers.
    pub fn departure_offset_secs(&self) -> i64 {
        i64::from(self.departure_day) * 86_400 + i64::from(self.departure.num_seconds_from_midnight())
    }

    /// Seconds since the start of the service date, counting day rollovers.
    pub fn arrival_offset_secs(&self) -> i64 {
        i64::from(self.arrival_day) * 86_400 + i64::from(self.arrival.num_seconds_from_midnight())
    }
}

impl fmt::Display for StopTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arr {}(+{}) dep {}(+{})",
            self.arrival.format("%H:%M:%S"),
            self.arrival_day,
            self.departure.format("%H:%M:%S"),
            self.departure_day
        )
    }
}

fn at_day_offset(date: NaiveDate, days: u8, time: NaiveTime) -> NaiveDateTime {
    let day = date
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(date);
    day.and_time(time)
}

/// Assign day counters to a sequence of (arrival, departure) clock times.
///
/// If a stop's arrival is earlier than the previous stop's departure the trip
/// crossed midnight between the two stops. If a stop's departure is earlier
/// than its own arrival the trip crossed midnight while dwelling there.
pub fn stop_times_from_clock(times: &[(NaiveTime, NaiveTime)]) -> Vec<StopTime> {
    let mut result = Vec::with_capacity(times.len());
    let Some(&(first_arrival, _)) = times.first() else {
        return result;
    };

    let mut days: u8 = 0;
    let mut last = first_arrival;
    for &(arrival, departure) in times {
        let (arrival_day, departure_day) = if arrival < last {
            days = days.saturating_add(1);
            (days, days)
        } else if departure < arrival {
            let arrival_day = days;
            days = days.saturating_add(1);
            (arrival_day, days)
        } else {
            (days, days)
        };
        last = departure;
        result.push(StopTime {
            arrival,
            departure,
            arrival_day,
            departure_day,
        });
    }
    result
}
