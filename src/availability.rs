use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{BookingError, Result};
use crate::types::{BusinessHours, TimeWindow};

/// Fixed step between successive candidate start times within a gap.
const SLOT_GRANULARITY_MINUTES: i64 = 60;

/// Computes every start time a booking of `duration` could occupy on
/// `date`, given the intervals already booked for that date and
/// service.
///
/// The caller filters `booked` to the requested date and service; no
/// refiltering happens here. Candidate starts are generated per free
/// gap at a fixed one-hour granularity, so neighbouring windows may
/// overlap each other: the result is a menu of mutually exclusive
/// choices, not a partition of the free time. Collisions are only
/// avoided against already-committed bookings.
///
/// A fully booked day yields an empty list, which is a normal outcome.
pub fn available_windows(
    date: NaiveDate,
    duration: Duration,
    hours: BusinessHours,
    booked: &[(NaiveTime, NaiveTime)],
) -> Result<Vec<TimeWindow>> {
    if duration <= Duration::zero() {
        let hours_repr = duration.num_minutes() as f64 / 60.0;
        return Err(BookingError::InvalidDuration(hours_repr.to_string()));
    }
    hours.validate()?;

    let mut intervals = booked.to_vec();
    intervals.sort_by_key(|(start, _)| *start);

    let close = date.and_time(hours.close);
    let mut windows = Vec::new();
    let mut cursor = date.and_time(hours.open);

    for (start, end) in intervals {
        let start = date.and_time(start);
        let end = date.and_time(end);
        scan_gap(cursor, start.min(close), duration, &mut windows);
        // An interval never moves the cursor backward, so touching or
        // overlapping bookings cannot reopen already-covered time.
        if end > cursor {
            cursor = end;
        }
    }
    scan_gap(cursor, close, duration, &mut windows);

    Ok(windows)
}

fn scan_gap(
    gap_start: NaiveDateTime,
    gap_end: NaiveDateTime,
    duration: Duration,
    windows: &mut Vec<TimeWindow>,
) {
    let mut candidate = gap_start;
    while candidate + duration <= gap_end {
        windows.push(TimeWindow {
            start: candidate,
            end: candidate + duration,
        });
        candidate += Duration::minutes(SLOT_GRANULARITY_MINUTES);
    }
}
