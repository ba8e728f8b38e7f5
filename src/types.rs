use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Main,
    Sub,
}

/// One row of the spa_info worksheet. The duration column keeps the
/// sheet's decimal-hour convention ("1.5" = 90 minutes) as raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ServiceKind,
    pub duration: String,
    pub price: String,
    pub description: String,
}

impl Service {
    pub fn duration(&self) -> Result<Duration> {
        duration_from_hours(&self.duration)
    }

    pub fn field(&self, field: &str) -> Option<String> {
        match field {
            "name" => Some(self.name.clone()),
            "type" => Some(
                match self.kind {
                    ServiceKind::Main => "main",
                    ServiceKind::Sub => "sub",
                }
                .to_string(),
            ),
            "duration" => Some(self.duration.clone()),
            "price" => Some(self.price.clone()),
            "description" => Some(self.description.clone()),
            _ => None,
        }
    }
}

/// Parses a decimal-hour duration ("2", "1.5") into a `Duration`,
/// rounded to whole minutes.
pub fn duration_from_hours(raw: &str) -> Result<Duration> {
    let hours: f64 = raw
        .trim()
        .parse()
        .map_err(|_| BookingError::InvalidDuration(raw.to_string()))?;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(BookingError::InvalidDuration(raw.to_string()));
    }
    Ok(Duration::minutes((hours * 60.0).round() as i64))
}

/// One row of the booking_data worksheet. All fields are kept as the
/// sheet stores them: date as YYYY-MM-DD, times as HH:MM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub service: String,
    pub name: String,
    pub phone_number: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub additional_service: String,
}

impl BookingRecord {
    pub fn field(&self, field: &str) -> Option<&str> {
        match field {
            "service" => Some(&self.service),
            "name" => Some(&self.name),
            "phone_number" => Some(&self.phone_number),
            "date" => Some(&self.date),
            "start_time" => Some(&self.start_time),
            "end_time" => Some(&self.end_time),
            "additional_service" => Some(&self.additional_service),
            _ => None,
        }
    }

    /// The booked (start, end) pair, if both times parse as HH:MM.
    pub fn interval(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = NaiveTime::parse_from_str(&self.start_time, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(&self.end_time, "%H:%M").ok()?;
        Some((start, end))
    }
}

/// A booking together with its worksheet row number.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedBooking {
    pub row: usize,
    pub record: BookingRecord,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BusinessHours {
    /// Daily opening time (inclusive)
    pub open: NaiveTime,

    /// Daily closing time (exclusive)
    pub close: NaiveTime,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(8, 0, 0).unwrap(), // 08:00
            close: NaiveTime::from_hms_opt(21, 0, 0).unwrap(), // 21:00
        }
    }
}

impl BusinessHours {
    pub fn validate(&self) -> Result<()> {
        if self.open >= self.close {
            return Err(BookingError::InvalidHours {
                open: self.open,
                close: self.close,
            });
        }
        Ok(())
    }
}

/// One offerable slot of exactly the requested service duration.
/// Produced by the availability engine, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at < self.end
    }
}
