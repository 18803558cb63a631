//! Accessors over a decoded webhook event.
//!
//! Events look like `{"entry":[{"changes":[{"field":..., "value":{...}}]}]}`.
//! Only `entry[0].changes[0]` is read. A missing `entry`/`changes`/`value`
//! path is a [`WhatsAppError::MalformedEvent`]; a missing `contacts`,
//! `messages` or `statuses` branch is just `None`.

use serde_json::Value;

use super::WhatsAppError;

fn first_change(data: &Value) -> Result<&Value, WhatsAppError> {
    let entry = data
        .get("entry")
        .and_then(|e| e.get(0))
        .ok_or_else(|| WhatsAppError::MalformedEvent("missing entry[0]".to_owned()))?;
    entry
        .get("changes")
        .and_then(|c| c.get(0))
        .ok_or_else(|| WhatsAppError::MalformedEvent("missing entry[0].changes[0]".to_owned()))
}

/// `entry[0].changes[0].value`.
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if any step of the path is absent.
pub fn preprocess(data: &Value) -> Result<&Value, WhatsAppError> {
    first_change(data)?.get("value").ok_or_else(|| {
        WhatsAppError::MalformedEvent("missing entry[0].changes[0].value".to_owned())
    })
}

/// First element of `value.<branch>`, or `None` when the branch is absent.
fn first_of<'a>(data: &'a Value, branch: &str) -> Result<Option<&'a Value>, WhatsAppError> {
    Ok(preprocess(data)?.get(branch).and_then(|items| items.get(0)))
}

/// Strings pass through, numbers are rendered; anything else is `None`.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read(data: &Value, branch: &str, pointer: &str) -> Result<Option<String>, WhatsAppError> {
    Ok(scalar_text(
        first_of(data, branch)?.and_then(|item| item.pointer(pointer)),
    ))
}

/// `value.contacts[0].wa_id`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_mobile(data: &Value) -> Result<Option<String>, WhatsAppError> {
    read(data, "contacts", "/wa_id")
}

/// `value.contacts[0].profile.name`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_name(data: &Value) -> Result<Option<String>, WhatsAppError> {
    read(data, "contacts", "/profile/name")
}

/// `value.messages[0].text.body`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_message(data: &Value) -> Result<Option<String>, WhatsAppError> {
    read(data, "messages", "/text/body")
}

/// `value.messages[0].id`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_message_id(data: &Value) -> Result<Option<String>, WhatsAppError> {
    read(data, "messages", "/id")
}

/// `value.messages[0].timestamp`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_message_timestamp(data: &Value) -> Result<Option<String>, WhatsAppError> {
    read(data, "messages", "/timestamp")
}

/// `value.messages[0].type`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_message_type(data: &Value) -> Result<Option<String>, WhatsAppError> {
    read(data, "messages", "/type")
}

/// `value.messages[0].interactive.list_reply`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_interactive_response(data: &Value) -> Result<Option<Value>, WhatsAppError> {
    Ok(first_of(data, "messages")?
        .and_then(|msg| msg.pointer("/interactive/list_reply"))
        .cloned())
}

/// `value.statuses[0].status`
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if the event path is absent.
pub fn get_delivery(data: &Value) -> Result<Option<String>, WhatsAppError> {
    read(data, "statuses", "/status")
}

/// `entry[0].changes[0].field`, a sibling of `value`.
///
/// # Errors
///
/// Returns [`WhatsAppError::MalformedEvent`] if `entry[0].changes[0]` is absent.
pub fn changed_field(data: &Value) -> Result<Option<String>, WhatsAppError> {
    Ok(scalar_text(first_change(data)?.get("field")))
}
