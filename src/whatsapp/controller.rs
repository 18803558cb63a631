//! Webhook endpoint controller.
//!
//! Handlers receive an explicit [`WebhookRequest`] instead of reading
//! process-global request state, so any HTTP server can drive them.

use std::collections::HashMap;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::webhook::{WebhookResponse, WebhookVerifier};

/// One inbound webhook request.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// HTTP method.
    pub method: Method,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
    /// Decoded JSON body, if any.
    pub body: Option<Value>,
}

/// Status plus JSON body to write back.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
}

impl ControllerResponse {
    fn code(status: StatusCode) -> Self {
        Self {
            status,
            body: json!({ "code": status.as_u16().to_string() }),
        }
    }
}

/// Dispatches webhook requests by method.
#[derive(Debug, Clone)]
pub struct WebhookController {
    verifier: WebhookVerifier,
}

impl WebhookController {
    /// Controller verifying handshakes with `verifier`.
    pub fn new(verifier: WebhookVerifier) -> Self {
        Self { verifier }
    }

    /// Route by method: GET handshakes, POST events, anything else 405.
    pub fn handle(&self, request: &WebhookRequest) -> ControllerResponse {
        match request.method {
            Method::GET => self.handshake(&request.query),
            Method::POST => receive(request.body.as_ref()),
            _ => ControllerResponse::code(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    fn handshake(&self, query: &HashMap<String, String>) -> ControllerResponse {
        if query.is_empty() {
            return ControllerResponse::code(StatusCode::NOT_FOUND);
        }
        let outcome = self.verifier.connect(query);
        let body = match outcome {
            WebhookResponse::Verified { challenge } => json!(challenge),
            WebhookResponse::Forbidden | WebhookResponse::BadRequest => Value::Null,
        };
        ControllerResponse {
            status: outcome.status(),
            body,
        }
    }
}

fn receive(body: Option<&Value>) -> ControllerResponse {
    let Some(data) = body.filter(|b| !is_empty_json(b)) else {
        return ControllerResponse::code(StatusCode::BAD_REQUEST);
    };

    let Some(msg) = data.pointer("/entry/0/changes/0/value/messages/0") else {
        debug!("webhook event carries no message");
        return ControllerResponse::code(StatusCode::BAD_REQUEST);
    };

    let user_id = data
        .pointer("/entry/0/changes/0/value/contacts/0/wa_id")
        .cloned()
        .unwrap_or(Value::Null);
    let msg_type = msg.get("type").cloned().unwrap_or(Value::Null);

    ControllerResponse {
        status: StatusCode::OK,
        body: json!({
            "code": "200",
            "data": {
                "msg": msg,
                "user_id": user_id,
                "msg_type": msg_type,
            },
        }),
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
