use std::io::{self, BufRead, StdinLock, Stdout, Write};

use tracing::debug;

use crate::error::{BookingError, Result};
use crate::types::{BookingRecord, PositionedBooking, Service, ServiceKind, TimeWindow};

/// Terminal front end: a blocking prompt/response loop plus the
/// presentation helpers. Generic over reader and writer so flows can
/// be driven by scripted input in tests.
pub struct Console<R, W> {
    reader: R,
    writer: W,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}")?;
        Ok(())
    }

    /// Issues `prompt` and reads lines until the validator accepts
    /// one. Invalid input prints the message and re-issues the same
    /// prompt; a closed input stream surfaces as `InputClosed`.
    pub fn prompt<T, F>(&mut self, prompt: &str, validate: F) -> Result<T>
    where
        F: Fn(&str) -> std::result::Result<T, String>,
    {
        loop {
            writeln!(self.writer, "{prompt}")?;
            self.writer.flush()?;

            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(BookingError::InputClosed);
            }
            let value = line.trim();

            match validate(value) {
                Ok(parsed) => return Ok(parsed),
                Err(message) => {
                    debug!(input = value, %message, "rejected input");
                    writeln!(self.writer, "Invalid input: {message}")?;
                }
            }
        }
    }

    pub fn print_options<S: AsRef<str>>(&mut self, options: &[S]) -> Result<()> {
        for (index, option) in options.iter().enumerate() {
            writeln!(self.writer, "{index}. {}", option.as_ref())?;
        }
        Ok(())
    }

    pub fn print_time_table(&mut self, windows: &[TimeWindow]) -> Result<()> {
        writeln!(self.writer, "Available time ranges:")?;
        for window in windows {
            writeln!(
                self.writer,
                "  {} - {}",
                window.start.format("%H:%M"),
                window.end.format("%H:%M")
            )?;
        }
        Ok(())
    }

    /// Review-screen rendering of the collected booking data; fields
    /// with no value yet are left out, as is an unset add-on.
    pub fn print_booking_info(&mut self, record: &BookingRecord) -> Result<()> {
        writeln!(self.writer, "Your booking information:")?;
        for field in [
            "service",
            "additional_service",
            "date",
            "start_time",
            "end_time",
            "name",
            "phone_number",
        ] {
            match record.field(field) {
                Some(value) if !value.is_empty() => {
                    writeln!(self.writer, "{field}: {value}")?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn print_user_bookings(&mut self, bookings: &[PositionedBooking]) -> Result<()> {
        for (index, booking) in bookings.iter().enumerate() {
            let record = &booking.record;
            writeln!(
                self.writer,
                "{index}. {} on {} at {} - {}",
                record.service, record.date, record.start_time, record.end_time
            )?;
        }
        Ok(())
    }

    pub fn print_service_info(&mut self, service: &Service) -> Result<()> {
        let kind = match service.kind {
            ServiceKind::Main => "main",
            ServiceKind::Sub => "sub",
        };
        writeln!(self.writer, "{}", service.name)?;
        writeln!(self.writer, "type: {kind}")?;
        writeln!(self.writer, "duration: {} hours", service.duration)?;
        writeln!(self.writer, "price: {}", service.price)?;
        writeln!(self.writer, "description: {}", service.description)?;
        Ok(())
    }
}
