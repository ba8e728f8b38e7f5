use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use csv::{StringRecord, WriterBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{BookingError, Result};
use crate::store::{BookingStore, FIRST_DATA_ROW};
use crate::types::{BookingRecord, PositionedBooking, Service, ServiceKind};

/// The spa workbook: a directory holding one CSV file per worksheet.
/// Both worksheets are resolved at construction and a missing file
/// fails fast instead of surfacing later as a read error.
#[derive(Debug)]
pub struct SpaWorkbook {
    spa_info: Worksheet,
    booking_data: Worksheet,
}

impl SpaWorkbook {
    pub fn open(dir: &Path) -> Result<Self> {
        let workbook = Self {
            spa_info: Worksheet::resolve(dir, "spa_info")?,
            booking_data: Worksheet::resolve(dir, "booking_data")?,
        };
        info!(dir = %dir.display(), "opened spa workbook");
        Ok(workbook)
    }
}

#[derive(Debug)]
struct Worksheet {
    name: &'static str,
    path: PathBuf,
}

impl Worksheet {
    fn resolve(dir: &Path, name: &'static str) -> Result<Self> {
        let path = dir.join(format!("{name}.csv"));
        if !path.is_file() {
            return Err(BookingError::WorksheetMissing(name.to_string()));
        }
        Ok(Self { name, path })
    }

    fn headers(&self) -> Result<StringRecord> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        Ok(reader.headers()?.clone())
    }

    fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(rows)
    }

    fn append_row(&self, fields: &[String]) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(fields)?;
        writer.flush()?;
        Ok(())
    }

    /// Removes one row by its 1-based worksheet position. Every row
    /// below it shifts up; the caller owns the shift correction when
    /// deleting more than one row.
    fn delete_row(&self, row: usize) -> Result<()> {
        let headers = self.headers()?;
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?);
        }

        let index = row
            .checked_sub(FIRST_DATA_ROW)
            .filter(|&index| index < rows.len())
            .ok_or_else(|| BookingError::RowOutOfRange {
                worksheet: self.name.to_string(),
                row,
            })?;
        rows.remove(index);

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(&headers)?;
        for record in &rows {
            writer.write_record(record)?;
        }
        writer.flush()?;
        debug!(worksheet = self.name, row, "deleted worksheet row");
        Ok(())
    }
}

impl BookingStore for SpaWorkbook {
    fn services(&self, kind: Option<ServiceKind>) -> Result<Vec<Service>> {
        let services: Vec<Service> = self.spa_info.records()?;
        Ok(match kind {
            Some(kind) => services
                .into_iter()
                .filter(|service| service.kind == kind)
                .collect(),
            None => services,
        })
    }

    fn service_field(&self, service: &str, field: &str) -> Result<Option<String>> {
        let services: Vec<Service> = self.spa_info.records()?;
        Ok(services
            .iter()
            .find(|candidate| candidate.name == service)
            .and_then(|candidate| candidate.field(field)))
    }

    fn bookings(&self) -> Result<Vec<PositionedBooking>> {
        let records: Vec<BookingRecord> = self.booking_data.records()?;
        Ok(records
            .into_iter()
            .enumerate()
            .map(|(index, record)| PositionedBooking {
                row: index + FIRST_DATA_ROW,
                record,
            })
            .collect())
    }

    fn append_booking(&self, record: &BookingRecord) -> Result<()> {
        let headers = self.booking_data.headers()?;
        let fields: Vec<String> = headers
            .iter()
            .map(|header| record.field(header).unwrap_or("").to_string())
            .collect();
        self.booking_data.append_row(&fields)?;
        debug!(service = %record.service, date = %record.date, "appended booking");
        Ok(())
    }

    fn delete_booking_at_position(&self, row: usize) -> Result<()> {
        self.booking_data.delete_row(row)
    }
}
