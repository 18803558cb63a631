//! HTTP transport seam.
//!
//! The SDK never talks to the network directly. [`Transport`] is the seam,
//! [`HttpTransport`] the `reqwest`-backed default.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::WhatsAppError;

/// HTTP connect timeout for the default client.
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for the default client.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Cap on the error body excerpt kept in log lines.
const MAX_LOGGED_BODY_CHARS: usize = 256;

/// What a transport call produced: parsed body, status code, status message.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// JSON body, `None` when empty or not JSON.
    pub body: Option<Value>,
    /// HTTP status code.
    pub code: u16,
    /// Graph API `error.message` when present, else the reason phrase.
    pub message: String,
}

impl TransportResponse {
    /// Whether `code` is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Assemble a response from a status and raw body text.
    pub fn from_parts(code: u16, reason: Option<&str>, raw_body: &str) -> Self {
        let body = if raw_body.trim().is_empty() {
            None
        } else {
            match serde_json::from_str::<Value>(raw_body) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(error = %e, "response body is not JSON");
                    None
                }
            }
        };

        let message = body
            .as_ref()
            .and_then(|b| b.pointer("/error/message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| reason.map(str::to_owned))
            .unwrap_or_default();

        Self {
            body,
            code,
            message,
        }
    }
}

/// Generic JSON-over-HTTP client used for every API call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request could not be completed.
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError>;

    /// POST a JSON body to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request could not be completed.
    async fn post(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError>;

    /// DELETE `url` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request could not be completed.
    async fn delete(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError>;
}

/// `reqwest`-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }
}

impl HttpTransport {
    /// Client with the given timeouts.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self { client }
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(
        &self,
        mut builder: reqwest::RequestBuilder,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %sanitize_body(&text),
                "WhatsApp API returned non-success status"
            );
        }

        Ok(TransportResponse::from_parts(
            status.as_u16(),
            status.canonical_reason(),
            &text,
        ))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        self.execute(self.client.get(url).query(query), None, headers)
            .await
    }

    async fn post(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        self.execute(self.client.post(url), Some(body), headers)
            .await
    }

    async fn delete(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        self.execute(self.client.delete(url), Some(body), headers)
            .await
    }
}

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"EAA[A-Za-z0-9]{20,}").ok())
        .as_ref()
}

/// Collapse whitespace, mask access tokens, and truncate for logging.
pub fn sanitize_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let sanitized = match token_pattern() {
        Some(regex) => regex.replace_all(&collapsed, "[REDACTED]").into_owned(),
        None => collapsed,
    };

    if sanitized.chars().count() > MAX_LOGGED_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_LOGGED_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
