use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use crate::error::Result;
use crate::store::{BookingStore, FIRST_DATA_ROW};
use crate::types::{BookingRecord, PositionedBooking, Service, ServiceKind};

pub struct MockBookingStoreInner {
    pub services: Mutex<Vec<Service>>,
    pub bookings: Mutex<Vec<PositionedBooking>>,
    pub appended: Mutex<Vec<BookingRecord>>,
    pub deleted_rows: Mutex<Vec<usize>>,
    pub calls_to_services: AtomicU64,
    pub calls_to_service_field: AtomicU64,
    pub calls_to_bookings: AtomicU64,
    pub calls_to_append_booking: AtomicU64,
    pub calls_to_delete_booking_at_position: AtomicU64,
}

#[derive(Clone)]
pub struct MockBookingStore(pub Arc<MockBookingStoreInner>);

impl MockBookingStore {
    pub fn new() -> Self {
        Self(Arc::new(MockBookingStoreInner {
            services: Mutex::default(),
            bookings: Mutex::default(),
            appended: Mutex::default(),
            deleted_rows: Mutex::default(),
            calls_to_services: AtomicU64::default(),
            calls_to_service_field: AtomicU64::default(),
            calls_to_bookings: AtomicU64::default(),
            calls_to_append_booking: AtomicU64::default(),
            calls_to_delete_booking_at_position: AtomicU64::default(),
        }))
    }

    pub fn with_services(services: Vec<Service>) -> Self {
        let store = Self::new();
        *store.0.services.lock().unwrap() = services;
        store
    }

    /// Appends scripted data, numbering rows the way the worksheet
    /// does.
    pub fn push_booking(&self, record: BookingRecord) {
        let mut bookings = self.0.bookings.lock().unwrap();
        let row = bookings.len() + FIRST_DATA_ROW;
        bookings.push(PositionedBooking { row, record });
    }
}

impl BookingStore for MockBookingStore {
    fn services(&self, kind: Option<ServiceKind>) -> Result<Vec<Service>> {
        self.0.calls_to_services.fetch_add(1, Ordering::SeqCst);
        let services = self.0.services.lock().unwrap();
        Ok(services
            .iter()
            .filter(|service| kind.is_none() || kind == Some(service.kind))
            .cloned()
            .collect())
    }

    fn service_field(&self, service: &str, field: &str) -> Result<Option<String>> {
        self.0.calls_to_service_field.fetch_add(1, Ordering::SeqCst);
        let services = self.0.services.lock().unwrap();
        Ok(services
            .iter()
            .find(|candidate| candidate.name == service)
            .and_then(|candidate| candidate.field(field)))
    }

    fn bookings(&self) -> Result<Vec<PositionedBooking>> {
        self.0.calls_to_bookings.fetch_add(1, Ordering::SeqCst);
        Ok(self.0.bookings.lock().unwrap().clone())
    }

    fn append_booking(&self, record: &BookingRecord) -> Result<()> {
        self.0
            .calls_to_append_booking
            .fetch_add(1, Ordering::SeqCst);
        self.0.appended.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn delete_booking_at_position(&self, row: usize) -> Result<()> {
        self.0
            .calls_to_delete_booking_at_position
            .fetch_add(1, Ordering::SeqCst);
        self.0.deleted_rows.lock().unwrap().push(row);
        Ok(())
    }
}
