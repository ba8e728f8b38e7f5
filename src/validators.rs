//! Field validators for the prompt loop. Every validator turns the
//! raw line into a parsed value or a user-facing message; messages
//! never escape the prompt loop as errors.

use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::types::TimeWindow;

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^\p{Alphabetic}+$").unwrap();
}

pub fn validate_integer_option(value: &str, min: usize, max: usize) -> Result<usize, String> {
    let option: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number."))?;
    if option < min || option > max {
        return Err(format!(
            "Please enter a number between {min} and {max} inclusive."
        ));
    }
    Ok(option)
}

/// A calendar date in YYYY-MM-DD format, today or later.
pub fn validate_date(value: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("'{value}' is not a valid date in format YYYY-MM-DD."))?;
    if date < today {
        return Err(format!(
            "Your date {value} is in the past. Please enter a future date."
        ));
    }
    Ok(date)
}

/// A time in HH:MM format falling inside one of the offered windows'
/// [start, end) bounds.
pub fn validate_time(value: &str, offered: &[TimeWindow]) -> Result<NaiveTime, String> {
    let time = NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("'{value}' is not a valid time in format HH:MM."))?;
    let in_range = offered
        .iter()
        .any(|window| window.contains(window.start.date().and_time(time)));
    if !in_range {
        return Err("Your time is not in the available time ranges.".to_string());
    }
    Ok(time)
}

pub fn validate_name(value: &str) -> Result<String, String> {
    if !NAME_RE.is_match(value) {
        return Err("The name must contain only letters.".to_string());
    }
    let length = value.chars().count();
    if !(3..=30).contains(&length) {
        return Err("The name must contain 3 to 30 characters.".to_string());
    }
    Ok(value.to_string())
}

/// An international phone number; the returned value is normalized to
/// E.164 ("+353 111111111" becomes "+353111111111").
pub fn validate_phone_number(value: &str) -> Result<String, String> {
    let number = phonenumber::parse(None, value)
        .map_err(|_| "The number must start with a country code, e.g. +353.".to_string())?;
    if !phonenumber::is_valid(&number) {
        return Err(format!("The number {value} is not valid"));
    }
    Ok(number
        .format()
        .mode(phonenumber::Mode::E164)
        .to_string())
}

/// E.164 form of an already-stored number, used when matching records
/// against user input. Numbers the phone library cannot parse are
/// compared as stored.
pub fn normalize_phone(value: &str) -> String {
    match phonenumber::parse(None, value) {
        Ok(number) => number.format().mode(phonenumber::Mode::E164).to_string(),
        Err(_) => value.to_string(),
    }
}

pub fn validate_yes_no(value: &str) -> Result<bool, String> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err("Please enter 'yes' or 'no'.".to_string()),
    }
}

/// One or more space-separated listing numbers, each within 0..=max.
pub fn validate_row_selection(value: &str, max: usize) -> Result<Vec<usize>, String> {
    let mut selection = Vec::new();
    for token in value.split_whitespace() {
        let number: usize = token
            .parse()
            .map_err(|_| format!("'{token}' is not a number."))?;
        if number > max {
            return Err(format!(
                "Please enter numbers between 0 and {max} inclusive."
            ));
        }
        selection.push(number);
    }
    if selection.is_empty() {
        return Err("Please enter at least one number.".to_string());
    }
    Ok(selection)
}
