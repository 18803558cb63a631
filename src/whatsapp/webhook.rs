//! Webhook subscription handshake.
//!
//! Meta calls `GET <webhook>?hub.mode=subscribe&hub.verify_token=...&hub.challenge=...`
//! when a webhook is registered. The endpoint proves ownership by echoing the
//! challenge back, but only when the verify token matches.

use std::collections::HashMap;

use reqwest::StatusCode;
use tracing::{info, warn};

/// Mode value Meta sends for a subscription request.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Query parameters of one handshake request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookHandshake {
    /// `hub.mode`
    pub mode: Option<String>,
    /// `hub.verify_token`
    pub verify_token: Option<String>,
    /// `hub.challenge`
    pub challenge: Option<String>,
}

impl WebhookHandshake {
    /// Extract the handshake from decoded query parameters.
    ///
    /// Dotted keys (`hub.mode`) win; underscored keys (`hub_mode`) are used
    /// only when the dotted key is absent.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let pick = |name: &str| {
            params
                .get(&format!("hub.{name}"))
                .or_else(|| params.get(&format!("hub_{name}")))
                .cloned()
        };
        Self {
            mode: pick("mode"),
            verify_token: pick("verify_token"),
            challenge: pick("challenge"),
        }
    }

    /// Extract the handshake from a raw, URL-encoded query string.
    pub fn from_query(query: &str) -> Self {
        Self::from_params(&parse_query(query))
    }
}

/// Decode `a=1&b=2` into a map. Later duplicates win.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

/// Outcome of one handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResponse {
    /// 200 with the integer challenge as body.
    Verified {
        /// Parsed challenge value.
        challenge: i64,
    },
    /// 403, token or mode mismatch.
    Forbidden,
    /// 400, mode or token missing.
    BadRequest,
}

impl WebhookResponse {
    /// HTTP status to answer with.
    pub fn status(self) -> StatusCode {
        match self {
            Self::Verified { .. } => StatusCode::OK,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::BadRequest => StatusCode::BAD_REQUEST,
        }
    }

    /// Response body, present only on success.
    pub fn body(self) -> Option<String> {
        match self {
            Self::Verified { challenge } => Some(challenge.to_string()),
            Self::Forbidden | Self::BadRequest => None,
        }
    }
}

/// Checks handshakes against one expected verify token. Stateless.
#[derive(Clone)]
pub struct WebhookVerifier {
    verify_token: String,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("verify_token", &"[REDACTED]")
            .finish()
    }
}

impl WebhookVerifier {
    /// Verifier expecting `verify_token`.
    pub fn new(verify_token: impl Into<String>) -> Self {
        Self {
            verify_token: verify_token.into(),
        }
    }

    /// Run the handshake over decoded query parameters.
    pub fn connect(&self, params: &HashMap<String, String>) -> WebhookResponse {
        self.verify(&WebhookHandshake::from_params(params))
    }

    /// Run the handshake over an already extracted [`WebhookHandshake`].
    pub fn verify(&self, handshake: &WebhookHandshake) -> WebhookResponse {
        let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);
        let (Some(mode), Some(token)) = (present(&handshake.mode), present(&handshake.verify_token))
        else {
            warn!("webhook handshake missing mode or verify token");
            return WebhookResponse::BadRequest;
        };

        if mode == SUBSCRIBE_MODE && !self.verify_token.is_empty() && token == self.verify_token {
            let challenge = parse_challenge(handshake.challenge.as_deref().unwrap_or_default());
            info!("webhook subscription verified");
            WebhookResponse::Verified { challenge }
        } else {
            warn!(mode = %mode, "webhook verification failed");
            WebhookResponse::Forbidden
        }
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits.
///
/// Anything unparseable yields 0; out-of-range values saturate.
pub fn parse_challenge(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b.saturating_sub(b'0'));
        value = match value.checked_mul(10).and_then(|v| {
            if negative {
                v.checked_sub(digit)
            } else {
                v.checked_add(digit)
            }
        }) {
            Some(v) => v,
            None if negative => return i64::MIN,
            None => return i64::MAX,
        };
    }
    value
}
