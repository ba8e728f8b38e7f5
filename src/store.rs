use crate::error::Result;
use crate::types::{BookingRecord, PositionedBooking, Service, ServiceKind};

/// Worksheet row number of the first data row: rows are 1-based and
/// row 1 is the header.
pub const FIRST_DATA_ROW: usize = 2;

/// Contract of the persistence collaborator. The store is addressed
/// by row position: deleting a row shifts every later row down by
/// one, and callers deleting several rows must correct for that.
pub trait BookingStore {
    /// Services in sheet order, optionally filtered by kind.
    fn services(&self, kind: Option<ServiceKind>) -> Result<Vec<Service>>;

    /// A single field of a named service; `None` when the service is
    /// absent rather than a hard failure.
    fn service_field(&self, service: &str, field: &str) -> Result<Option<String>>;

    /// All bookings in insertion order, each with its row number.
    fn bookings(&self) -> Result<Vec<PositionedBooking>>;

    /// Appends one booking using the worksheet's existing column
    /// order; fields the record does not carry are written empty.
    fn append_booking(&self, record: &BookingRecord) -> Result<()>;

    /// Deletes exactly one row. Rows after `row` shift down by one.
    fn delete_booking_at_position(&self, row: usize) -> Result<()>;
}
