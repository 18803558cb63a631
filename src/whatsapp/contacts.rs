//! Contact card validation and normalization.
//!
//! Incoming contacts are untrusted JSON objects. Only the keys in
//! [`ALLOWED_KEYS`] survive; `birthday` is rewritten to `YYYY-MM-DD`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::debug;

use super::WhatsAppError;

/// Keys copied from an input contact, everything else is dropped.
pub const ALLOWED_KEYS: [&str; 6] = ["addresses", "birthday", "name", "org", "phones", "urls"];

/// Keys whose value must be a non-empty array of objects.
const RECORD_LIST_KEYS: [&str; 3] = ["addresses", "phones", "urls"];

/// Date layouts accepted for `birthday`, tried in order.
const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// `%Y` takes a year of any width, so `05/01/90` would parse as year 90.
const MIN_BIRTH_YEAR: i32 = 1000;

fn invalid(reason: impl Into<String>) -> WhatsAppError {
    WhatsAppError::Validation(reason.into())
}

/// Validate one contact and return its normalized form.
///
/// # Errors
///
/// Returns [`WhatsAppError::Validation`] when the contact is not a non-empty
/// object, the name rules fail, the birthday cannot be parsed, or a list
/// field is not a non-empty array of objects.
pub fn normalize_contact(contact: &Value) -> Result<Value, WhatsAppError> {
    let fields = contact
        .as_object()
        .filter(|fields| !fields.is_empty())
        .ok_or_else(|| invalid("contact must be a non-empty object"))?;

    validate_name(fields.get("name"))?;

    let mut normalized = Map::new();
    for (key, value) in fields {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            debug!(key = %key, "dropping unsupported contact field");
            continue;
        }

        let value = match key.as_str() {
            "birthday" => Value::String(normalize_birthday(value)?),
            k if RECORD_LIST_KEYS.contains(&k) => {
                validate_record_list(k, value)?;
                value.clone()
            }
            _ => value.clone(),
        };
        normalized.insert(key.clone(), value);
    }

    Ok(Value::Object(normalized))
}

fn validate_name(name: Option<&Value>) -> Result<(), WhatsAppError> {
    let name = name
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("contact name is required"))?;

    let present = |key: &str| {
        name.get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };

    if !present("formatted_name") {
        return Err(invalid("contact name.formatted_name is required"));
    }
    if !present("first_name") && !present("middle_name") {
        return Err(invalid(
            "contact name needs first_name or middle_name",
        ));
    }
    Ok(())
}

fn validate_record_list(key: &str, value: &Value) -> Result<(), WhatsAppError> {
    match value.as_array().and_then(|items| items.first()) {
        Some(first) if first.is_object() => Ok(()),
        _ => Err(invalid(format!(
            "contact {key} must be a non-empty list of objects"
        ))),
    }
}

/// Parse a birthday in any accepted layout and render it as `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns [`WhatsAppError::Validation`] when the value is not a string or
/// matches no layout.
pub fn normalize_birthday(value: &Value) -> Result<String, WhatsAppError> {
    let raw = value
        .as_str()
        .map(str::trim)
        .ok_or_else(|| invalid("contact birthday must be a string"))?;

    parse_date(raw)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| invalid(format!("contact birthday is not a date: {raw}")))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_any_layout(raw).filter(|date| date.year() >= MIN_BIRTH_YEAR)
}

fn parse_any_layout(raw: &str) -> Option<NaiveDate> {
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
