//! Interactive (list / button) message objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::WhatsAppError;

/// Caller-side description of an interactive message.
///
/// `body` and `action` are required; `header` and `footer` are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractiveButton {
    /// Header text.
    #[serde(default)]
    pub header: Option<String>,
    /// Body text.
    #[serde(default)]
    pub body: Option<String>,
    /// Footer text.
    #[serde(default)]
    pub footer: Option<String>,
    /// Action object (buttons, sections), passed through untouched.
    #[serde(default)]
    pub action: Option<Value>,
}

/// `interactive` object on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    /// `list`, `button`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Text header, only when supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<InteractionHeader>,
    /// Body text.
    pub body: TextObject,
    /// Footer text, only when supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<TextObject>,
    /// Action object.
    pub action: Value,
}

/// `{"type": "text", "text": ...}` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionHeader {
    /// Always `text`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Header text.
    pub text: String,
}

/// `{"text": ...}` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextObject {
    /// The text.
    pub text: String,
}

fn non_empty(value: Option<&String>) -> Option<&String> {
    value.filter(|s| !s.is_empty())
}

/// Turn an [`InteractiveButton`] into a wire [`Interaction`] of type `kind`.
///
/// # Errors
///
/// Returns [`WhatsAppError::Validation`] when `body` or `action` is missing.
pub fn create_interaction(
    button: &InteractiveButton,
    kind: &str,
) -> Result<Interaction, WhatsAppError> {
    let body = non_empty(button.body.as_ref())
        .ok_or_else(|| WhatsAppError::Validation("interactive body is required".to_owned()))?;
    let action = button
        .action
        .as_ref()
        .filter(|a| !a.is_null())
        .ok_or_else(|| WhatsAppError::Validation("interactive action is required".to_owned()))?;

    Ok(Interaction {
        kind: kind.to_owned(),
        header: non_empty(button.header.as_ref()).map(|text| InteractionHeader {
            kind: "text",
            text: text.clone(),
        }),
        body: TextObject { text: body.clone() },
        footer: non_empty(button.footer.as_ref()).map(|text| TextObject { text: text.clone() }),
        action: action.clone(),
    })
}
