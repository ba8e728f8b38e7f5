use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid service duration '{0}': must be a positive decimal number of hours")]
    InvalidDuration(String),

    #[error("business hours are invalid: open {open} is not before close {close}")]
    InvalidHours { open: NaiveTime, close: NaiveTime },

    #[error("worksheet '{0}' not found in the data directory")]
    WorksheetMissing(String),

    #[error("row {row} is out of range for worksheet '{worksheet}'")]
    RowOutOfRange { worksheet: String, row: usize },

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("input stream closed")]
    InputClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, BookingError>;
