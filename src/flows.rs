use std::io::{BufRead, Write};

use chrono::{Local, NaiveTime};
use tracing::{debug, info, warn};

use crate::availability::available_windows;
use crate::console::Console;
use crate::error::{BookingError, Result};
use crate::store::BookingStore;
use crate::types::{
    duration_from_hours, BookingRecord, BusinessHours, PositionedBooking, Service, ServiceKind,
};
use crate::validators;

const FLOW_OPTIONS: [&str; 4] = [
    "Book spa treatment",
    "Cancel booking",
    "Check availability",
    "Treatment information",
];

const CHANGE_FIELDS: [&str; 4] = [
    "Service",
    "Additional services",
    "Date and time",
    "Name and phone number",
];

const NAME_PROMPT: &str =
    "Enter your name:\n(it must contain only letters and 3 to 30 characters)";
const PHONE_PROMPT: &str = "Enter your phone number in format +353 111111111:";

/// How a flow handed control back to the main menu. Aborting is an
/// ordinary transition, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Completed,
    Aborted,
}

/// One step of the booking form. The forward pass walks the steps in
/// order; the review screen loops back into a single step at a time
/// until the user confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookingStep {
    Service,
    AddOns,
    DateTime,
    Contact,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReviewOutcome {
    Confirmed,
    Edited,
    Abort,
}

/// Collected booking data, kept in the sheet's own text formats so
/// the review screen and the persisted record read identically.
#[derive(Debug, Default)]
struct BookingDraft {
    service: String,
    additional_service: String,
    date: String,
    start_time: String,
    end_time: String,
    name: String,
    phone_number: String,
}

impl BookingDraft {
    fn record(&self) -> BookingRecord {
        BookingRecord {
            service: self.service.clone(),
            name: self.name.clone(),
            phone_number: self.phone_number.clone(),
            date: self.date.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            additional_service: self.additional_service.clone(),
        }
    }
}

pub struct FlowController<S, R, W> {
    store: S,
    console: Console<R, W>,
    hours: BusinessHours,
}

impl<S: BookingStore, R: BufRead, W: Write> FlowController<S, R, W> {
    pub fn new(store: S, console: Console<R, W>) -> Self {
        Self {
            store,
            console,
            hours: BusinessHours::default(),
        }
    }

    /// Runs the top-level menu until the input stream closes.
    pub fn run(&mut self) -> Result<()> {
        self.console.say("Welcome to the Spa Booking System")?;
        loop {
            match self.main_menu() {
                Ok(()) => {}
                Err(BookingError::InputClosed) => {
                    self.console.say("Goodbye.")?;
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn main_menu(&mut self) -> Result<()> {
        self.console.say("Please select an option:")?;
        self.console.print_options(&FLOW_OPTIONS)?;
        let choice = self.console.prompt("Enter option number:", |value| {
            validators::validate_integer_option(value, 0, FLOW_OPTIONS.len() - 1)
        })?;

        let outcome = match choice {
            0 => self.booking_flow()?,
            1 => self.cancel_flow()?,
            2 => self.availability_flow()?,
            _ => self.service_info_flow()?,
        };
        debug!(option = FLOW_OPTIONS[choice], ?outcome, "flow finished");
        Ok(())
    }

    fn booking_flow(&mut self) -> Result<FlowOutcome> {
        let mut draft = BookingDraft::default();
        let mut step = BookingStep::Service;
        loop {
            step = match step {
                BookingStep::Service => {
                    if !self.collect_service(&mut draft)? {
                        return Ok(FlowOutcome::Aborted);
                    }
                    BookingStep::AddOns
                }
                BookingStep::AddOns => {
                    self.collect_add_ons(&mut draft)?;
                    BookingStep::DateTime
                }
                BookingStep::DateTime => {
                    if !self.collect_date_time(&mut draft)? {
                        return Ok(FlowOutcome::Aborted);
                    }
                    BookingStep::Contact
                }
                BookingStep::Contact => {
                    self.collect_contact(&mut draft)?;
                    BookingStep::Review
                }
                BookingStep::Review => match self.review_and_edit(&mut draft)? {
                    ReviewOutcome::Confirmed => break,
                    ReviewOutcome::Edited => BookingStep::Review,
                    ReviewOutcome::Abort => return Ok(FlowOutcome::Aborted),
                },
            };
        }

        let record = draft.record();
        self.store.append_booking(&record)?;
        info!(service = %record.service, date = %record.date, "booking saved");

        self.console.say("Your booking has been successfully saved.")?;
        self.console.say(&format!("Service: {}", record.service))?;
        self.console.say(&format!("Date: {}", record.date))?;
        self.console
            .say(&format!("Time: {} - {}", record.start_time, record.end_time))?;
        self.console.say(&format!("Name: {}", record.name))?;
        Ok(FlowOutcome::Completed)
    }

    fn review_and_edit(&mut self, draft: &mut BookingDraft) -> Result<ReviewOutcome> {
        self.console.print_booking_info(&draft.record())?;
        self.console.say("Do you want change your booking data?")?;
        if !self.prompt_yes_no()? {
            return Ok(ReviewOutcome::Confirmed);
        }

        self.console.print_options(&CHANGE_FIELDS)?;
        let field = self.console.prompt(
            "Enter the number of the field you want to change:",
            |value| validators::validate_integer_option(value, 0, CHANGE_FIELDS.len() - 1),
        )?;
        match field {
            0 => {
                if !self.collect_service(draft)? {
                    return Ok(ReviewOutcome::Abort);
                }
            }
            1 => self.collect_add_ons(draft)?,
            2 => {
                if !self.collect_date_time(draft)? {
                    return Ok(ReviewOutcome::Abort);
                }
            }
            _ => self.collect_contact(draft)?,
        }
        Ok(ReviewOutcome::Edited)
    }

    fn collect_service(&mut self, draft: &mut BookingDraft) -> Result<bool> {
        let chosen = self.choose_service(
            Some(ServiceKind::Main),
            "Choose a service:",
            "Enter service number:",
        )?;
        match chosen {
            Some(service) => {
                draft.service = service.name;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn collect_add_ons(&mut self, draft: &mut BookingDraft) -> Result<()> {
        self.console
            .say("Do you want to add any additional services?")?;
        if self.prompt_yes_no()? {
            let chosen = self.choose_service(
                Some(ServiceKind::Sub),
                "Choose an additional service:",
                "Enter additional service number:",
            )?;
            if let Some(service) = chosen {
                draft.additional_service = service.name;
            }
        }
        Ok(())
    }

    /// Collects date and time against a fresh availability snapshot.
    /// Returns false when the user gives up on a fully booked date
    /// and wants the main menu back.
    fn collect_date_time(&mut self, draft: &mut BookingDraft) -> Result<bool> {
        let duration_raw = self
            .store
            .service_field(&draft.service, "duration")?
            .ok_or_else(|| BookingError::ServiceNotFound(draft.service.clone()))?;
        let duration = duration_from_hours(&duration_raw)?;

        loop {
            self.console
                .say("Choose the date when you want to visit us.")?;
            let today = Local::now().date_naive();
            let date = self
                .console
                .prompt("Enter the date in format YYYY-MM-DD:", |value| {
                    validators::validate_date(value, today)
                })?;
            let date_repr = date.format("%Y-%m-%d").to_string();

            let booked = self.booked_intervals(&date_repr, &draft.service)?;
            let windows = available_windows(date, duration, self.hours, &booked)?;
            if windows.is_empty() {
                self.console.say(&format!(
                    "No available times on {date_repr} for {}.",
                    draft.service
                ))?;
                self.console.say("Do you want to try another date?")?;
                if self.prompt_yes_no()? {
                    continue;
                }
                return Ok(false);
            }

            self.console
                .say("Choose the time when you want to visit us.")?;
            self.console.print_time_table(&windows)?;
            let start = self
                .console
                .prompt("Enter the time in format HH:MM:", |value| {
                    validators::validate_time(value, &windows)
                })?;

            let end = date.and_time(start) + duration;
            draft.date = date_repr;
            draft.start_time = start.format("%H:%M").to_string();
            draft.end_time = end.format("%H:%M").to_string();
            return Ok(true);
        }
    }

    fn collect_contact(&mut self, draft: &mut BookingDraft) -> Result<()> {
        self.console.say("Please enter your name")?;
        draft.name = self.console.prompt(NAME_PROMPT, validators::validate_name)?;
        // The sheet keeps the number as typed; normalization happens
        // only when matching during cancellation.
        draft.phone_number = self.console.prompt(PHONE_PROMPT, |value| {
            validators::validate_phone_number(value).map(|_| value.to_string())
        })?;
        Ok(())
    }

    fn cancel_flow(&mut self) -> Result<FlowOutcome> {
        loop {
            self.console.say(
                "Please enter your name and phone number with which you made the booking.",
            )?;
            let name = self.console.prompt(NAME_PROMPT, validators::validate_name)?;
            let phone = self
                .console
                .prompt(PHONE_PROMPT, validators::validate_phone_number)?;

            let matches: Vec<PositionedBooking> = self
                .store
                .bookings()?
                .into_iter()
                .filter(|booking| {
                    booking.record.name == name
                        && validators::normalize_phone(&booking.record.phone_number) == phone
                })
                .collect();

            if matches.is_empty() {
                self.console.say(&format!(
                    "No bookings found for the provided name '{name}' and phone number '{phone}'."
                ))?;
                self.console.say("Do you want to try again?")?;
                if self.prompt_yes_no()? {
                    continue;
                }
                return Ok(FlowOutcome::Aborted);
            }

            self.console.say("Your bookings:")?;
            self.console.print_user_bookings(&matches)?;
            let selection = self.console.prompt(
                "Enter the numbers of the bookings you want to cancel (space separated):",
                |value| validators::validate_row_selection(value, matches.len() - 1),
            )?;

            let mut rows: Vec<usize> = selection.iter().map(|&index| matches[index].row).collect();
            rows.sort_unstable();
            rows.dedup();

            self.console
                .say(&format!("Do you want to cancel {} booking(s)?", rows.len()))?;
            if !self.prompt_yes_no()? {
                return Ok(FlowOutcome::Aborted);
            }

            // Each delete shifts the rows below it up by one, so every
            // later target is requested one position earlier per
            // delete already applied.
            for (already_deleted, row) in rows.iter().enumerate() {
                self.store.delete_booking_at_position(row - already_deleted)?;
            }
            info!(cancelled = rows.len(), "bookings cancelled");
            self.console.say("Your booking(s) have been cancelled.")?;
            return Ok(FlowOutcome::Completed);
        }
    }

    fn availability_flow(&mut self) -> Result<FlowOutcome> {
        let chosen = self.choose_service(
            Some(ServiceKind::Main),
            "Choose a service:",
            "Enter service number:",
        )?;
        let Some(service) = chosen else {
            return Ok(FlowOutcome::Aborted);
        };
        let duration = service.duration()?;

        self.console.say("Choose the date you want to check.")?;
        let today = Local::now().date_naive();
        let date = self
            .console
            .prompt("Enter the date in format YYYY-MM-DD:", |value| {
                validators::validate_date(value, today)
            })?;
        let date_repr = date.format("%Y-%m-%d").to_string();

        let booked = self.booked_intervals(&date_repr, &service.name)?;
        let windows = available_windows(date, duration, self.hours, &booked)?;
        if windows.is_empty() {
            self.console.say(&format!(
                "No available times on {date_repr} for {}.",
                service.name
            ))?;
        } else {
            self.console.print_time_table(&windows)?;
        }
        Ok(FlowOutcome::Completed)
    }

    fn service_info_flow(&mut self) -> Result<FlowOutcome> {
        let chosen = self.choose_service(None, "Our services:", "Enter service number:")?;
        let Some(service) = chosen else {
            return Ok(FlowOutcome::Aborted);
        };
        self.console.print_service_info(&service)?;
        Ok(FlowOutcome::Completed)
    }

    fn choose_service(
        &mut self,
        kind: Option<ServiceKind>,
        heading: &str,
        prompt: &str,
    ) -> Result<Option<Service>> {
        let mut services = self.store.services(kind)?;
        if services.is_empty() {
            self.console.say("No services are currently on offer.")?;
            return Ok(None);
        }

        self.console.say(heading)?;
        let names: Vec<&str> = services.iter().map(|service| service.name.as_str()).collect();
        self.console.print_options(&names)?;
        let index = self.console.prompt(prompt, |value| {
            validators::validate_integer_option(value, 0, services.len() - 1)
        })?;
        Ok(Some(services.swap_remove(index)))
    }

    fn booked_intervals(
        &self,
        date: &str,
        service: &str,
    ) -> Result<Vec<(NaiveTime, NaiveTime)>> {
        let bookings = self.store.bookings()?;
        Ok(bookings
            .iter()
            .filter(|booking| booking.record.date == date && booking.record.service == service)
            .filter_map(|booking| {
                let interval = booking.record.interval();
                if interval.is_none() {
                    warn!(row = booking.row, "skipping booking with malformed times");
                }
                interval
            })
            .collect())
    }

    fn prompt_yes_no(&mut self) -> Result<bool> {
        self.console
            .prompt("Enter 'yes' or 'no':", validators::validate_yes_no)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutils::MockBookingStore;
    use crate::workbook::SpaWorkbook;
    use std::io::Cursor;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn scripted(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn service(name: &str, kind: ServiceKind, duration: &str) -> Service {
        Service {
            name: name.into(),
            kind,
            duration: duration.into(),
            price: "100".into(),
            description: format!("{name} description"),
        }
    }

    fn store_with_services() -> MockBookingStore {
        MockBookingStore::with_services(vec![
            service("Full body massage", ServiceKind::Main, "2"),
            service("Facial", ServiceKind::Main, "1"),
            service("Hot stones", ServiceKind::Sub, "0.5"),
        ])
    }

    fn booking(service: &str, name: &str, phone: &str, date: &str, start: &str, end: &str) -> BookingRecord {
        BookingRecord {
            service: service.into(),
            name: name.into(),
            phone_number: phone.into(),
            date: date.into(),
            start_time: start.into(),
            end_time: end.into(),
            additional_service: String::new(),
        }
    }

    fn printed<S>(controller: FlowController<S, Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(controller.console.into_inner().1).unwrap()
    }

    #[test]
    fn booking_flow_saves_a_confirmed_booking() {
        let store = store_with_services();
        let input = "0\nyes\n0\n2099-07-14\n08:00\nGreta\n+44 20 7946 0958\nno\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        let outcome = controller.booking_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        let appended = store.0.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        let record = &appended[0];
        assert_eq!(record.service, "Full body massage");
        assert_eq!(record.additional_service, "Hot stones");
        assert_eq!(record.date, "2099-07-14");
        assert_eq!(record.start_time, "08:00");
        assert_eq!(record.end_time, "10:00");
        assert_eq!(record.name, "Greta");
        assert_eq!(record.phone_number, "+44 20 7946 0958");

        let output = printed(controller);
        assert!(output.contains("Your booking has been successfully saved."));
        assert!(output.contains("Time: 08:00 - 10:00"));
    }

    #[test]
    fn booking_flow_fractional_duration_end_time() {
        let store = store_with_services();
        // Facial with the half-hour add-on still books the facial's
        // one-hour duration; the add-on does not stretch the slot.
        let input = "1\nno\n2099-07-14\n09:00\nGreta\n+44 20 7946 0958\nno\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        controller.booking_flow().unwrap();

        let appended = store.0.appended.lock().unwrap();
        assert_eq!(appended[0].service, "Facial");
        assert_eq!(appended[0].end_time, "10:00");
        assert_eq!(appended[0].additional_service, "");
    }

    #[test]
    fn booking_flow_review_edit_replaces_one_field_group() {
        let store = store_with_services();
        let input = "0\nno\n2099-07-14\n08:00\nGreta\n+44 20 7946 0958\n\
                     yes\n3\nHelga\n+44 20 7946 0958\nno\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        let outcome = controller.booking_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        let appended = store.0.appended.lock().unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].name, "Helga");
        assert_eq!(appended[0].service, "Full body massage");
        assert_eq!(appended[0].start_time, "08:00");
    }

    #[test]
    fn booking_flow_rejects_times_outside_the_offered_windows() {
        let store = store_with_services();
        store.push_booking(booking(
            "Full body massage",
            "Den",
            "+353111111111",
            "2099-07-14",
            "08:00",
            "10:00",
        ));
        let input = "0\nno\n2099-07-14\n08:30\n10:00\nGreta\n+44 20 7946 0958\nno\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        controller.booking_flow().unwrap();

        let appended = store.0.appended.lock().unwrap();
        assert_eq!(appended[0].start_time, "10:00");
        assert_eq!(appended[0].end_time, "12:00");

        let output = printed(controller);
        assert!(output.contains("Invalid input: Your time is not in the available time ranges."));
    }

    #[test]
    fn booking_flow_fully_booked_date_can_abort_to_menu() {
        let store = store_with_services();
        store.push_booking(booking(
            "Full body massage",
            "Den",
            "+353111111111",
            "2099-07-14",
            "08:00",
            "21:00",
        ));
        let input = "0\nno\n2099-07-14\nno\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        let outcome = controller.booking_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Aborted);
        assert!(store.0.appended.lock().unwrap().is_empty());
        let output = printed(controller);
        assert!(output.contains("No available times on 2099-07-14 for Full body massage."));
    }

    #[test]
    fn booking_flow_fully_booked_date_can_retry_another_date() {
        let store = store_with_services();
        store.push_booking(booking(
            "Full body massage",
            "Den",
            "+353111111111",
            "2099-07-14",
            "08:00",
            "21:00",
        ));
        let input = "0\nno\n2099-07-14\nyes\n2099-07-15\n08:00\nGreta\n+44 20 7946 0958\nno\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        let outcome = controller.booking_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        let appended = store.0.appended.lock().unwrap();
        assert_eq!(appended[0].date, "2099-07-15");
    }

    #[test]
    fn cancel_flow_no_match_offers_retry_then_menu() {
        let store = store_with_services();
        store.push_booking(booking(
            "Facial",
            "Den",
            "+353111111111",
            "2099-07-14",
            "08:00",
            "09:00",
        ));
        let input = "Greta\n+44 20 7946 0958\nyes\nGreta\n+44 20 7946 0958\nno\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        let outcome = controller.cancel_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Aborted);
        assert_eq!(
            store.0.calls_to_delete_booking_at_position.load(Ordering::SeqCst),
            0
        );
        let output = printed(controller);
        assert!(output.contains(
            "No bookings found for the provided name 'Greta' and phone number '+442079460958'."
        ));
    }

    #[test]
    fn cancel_flow_applies_the_positional_shift_correction() {
        let store = store_with_services();
        // Rows 2..=9; John holds rows 3, 5 and 7.
        for (index, name) in ["Ann", "John", "Cleo", "John", "Ewa", "John", "Gus", "Hana"]
            .iter()
            .enumerate()
        {
            let phone = if *name == "John" {
                "+442079460958"
            } else {
                "+353111111111"
            };
            store.push_booking(booking(
                "Facial",
                name,
                phone,
                "2099-07-14",
                &format!("{:02}:00", 8 + index),
                &format!("{:02}:00", 9 + index),
            ));
        }
        let input = "John\n+44 20 7946 0958\n0 1 2\nyes\n";
        let mut controller = FlowController::new(store.clone(), scripted(input));

        let outcome = controller.cancel_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        let deleted = store.0.deleted_rows.lock().unwrap();
        assert_eq!(*deleted, vec![3, 4, 5]);
    }

    #[test]
    fn cancel_flow_against_the_workbook_leaves_the_right_survivors() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("spa_info.csv"),
            "name,type,duration,price,description\nFacial,main,1,60,Deep cleansing facial\n",
        )
        .unwrap();
        let mut sheet =
            String::from("service,name,phone_number,date,start_time,end_time,additional_service\n");
        for name in ["Ann", "John", "Cleo", "John", "Ewa", "John", "Gus"] {
            let phone = if name == "John" {
                "+442079460958"
            } else {
                "+353111111111"
            };
            sheet.push_str(&format!(
                "Facial,{name},{phone},2099-07-14,08:00,09:00,\n"
            ));
        }
        std::fs::write(dir.path().join("booking_data.csv"), sheet).unwrap();

        let workbook = SpaWorkbook::open(dir.path()).unwrap();
        let input = "John\n+44 20 7946 0958\n0 1 2\nyes\n";
        let mut controller = FlowController::new(workbook, scripted(input));

        let outcome = controller.cancel_flow().unwrap();
        assert_eq!(outcome, FlowOutcome::Completed);

        let survivors: Vec<String> = SpaWorkbook::open(dir.path())
            .unwrap()
            .bookings()
            .unwrap()
            .into_iter()
            .map(|booking| booking.record.name)
            .collect();
        assert_eq!(survivors, vec!["Ann", "Cleo", "Ewa", "Gus"]);
    }

    #[test]
    fn availability_flow_prints_the_window_table() {
        let store = store_with_services();
        store.push_booking(booking(
            "Full body massage",
            "Den",
            "+353111111111",
            "2099-07-14",
            "10:00",
            "12:00",
        ));
        let input = "0\n2099-07-14\n";
        let mut controller = FlowController::new(store, scripted(input));

        let outcome = controller.availability_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        let output = printed(controller);
        assert!(output.contains("08:00 - 10:00"));
        assert!(output.contains("12:00 - 14:00"));
        assert!(output.contains("19:00 - 21:00"));
        assert!(!output.contains("09:00 - 11:00"));
    }

    #[test]
    fn service_info_flow_lists_every_service() {
        let store = store_with_services();
        let input = "2\n";
        let mut controller = FlowController::new(store, scripted(input));

        let outcome = controller.service_info_flow().unwrap();

        assert_eq!(outcome, FlowOutcome::Completed);
        let output = printed(controller);
        assert!(output.contains("2. Hot stones"));
        assert!(output.contains("Hot stones description"));
        assert!(output.contains("duration: 0.5 hours"));
    }

    #[test]
    fn run_exits_cleanly_when_input_closes() {
        let store = store_with_services();
        let input = "3\n0\n";
        let mut controller = FlowController::new(store, scripted(input));

        controller.run().unwrap();

        let output = printed(controller);
        assert!(output.contains("Welcome to the Spa Booking System"));
        assert!(output.contains("Full body massage description"));
        assert!(output.contains("Goodbye."));
        // The menu was offered again after the finished flow.
        assert_eq!(output.matches("Please select an option:").count(), 2);
    }
}
