//! WhatsApp Cloud API adapter: payload builders, webhook handshake, event
//! extraction, and the [`Whatsapp`] entry facade.
//!
//! Builders validate everything up front and hand back an
//! [`OutboundRequest`](messages::OutboundRequest); only [`Whatsapp::send`]
//! touches the network, through an injected [`Transport`].

pub mod contacts;
pub mod controller;
pub mod events;
pub mod interactive;
pub mod messages;
pub mod transport;
pub mod webhook;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;

use self::interactive::InteractiveButton;
use self::messages::{MediaOptions, OutboundRequest, PayloadBuilder, TextOptions};
use self::transport::{HttpTransport, Transport, TransportResponse};
use self::webhook::WebhookVerifier;

/// Errors from the WhatsApp adapter.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// Endpoint credentials are missing or unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Caller input was rejected before any request was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The bundled HTTP transport could not complete the request.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A custom transport reported a failure.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A request body could not be encoded.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A webhook event lacks the `entry[0].changes[0]` path.
    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),
}

/// Opt-in fail-soft handling for builder results.
///
/// Builders fail fast by default. Call `.or_log()` to log the error and carry
/// on with `None` instead.
pub trait FailSoft<T> {
    /// Log an error at `warn` and discard it.
    fn or_log(self) -> Option<T>;
}

impl<T> FailSoft<T> for Result<T, WhatsAppError> {
    fn or_log(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "discarding failed WhatsApp operation");
                None
            }
        }
    }
}

/// Entry facade binding one [`Config`] to a payload builder, a webhook
/// verifier, and a transport.
///
/// Holds mutable builder state, so use one instance per logical outbound
/// message sequence.
pub struct Whatsapp {
    config: Config,
    messages: PayloadBuilder,
    transport: Arc<dyn Transport>,
    verify_token: String,
}

impl std::fmt::Debug for Whatsapp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Whatsapp")
            .field("config", &self.config)
            .field("verify_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Whatsapp {
    /// Facade over the default [`HttpTransport`].
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::default()))
    }

    /// Facade over a caller-supplied transport.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            messages: PayloadBuilder::new(config.clone()),
            config,
            transport,
            verify_token: String::new(),
        }
    }

    /// Build the facade straight from raw credentials.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Config`] when the id or token is empty.
    pub fn from_parts(
        phone_number_id: &str,
        access_token: &str,
        api_version: &str,
    ) -> Result<Self, WhatsAppError> {
        Ok(Self::new(Config::new(
            phone_number_id,
            access_token,
            api_version,
        )?))
    }

    /// Set the token expected during the webhook handshake.
    #[must_use]
    pub fn with_verify_token(mut self, verify_token: impl Into<String>) -> Self {
        self.verify_token = verify_token.into();
        self
    }

    /// The endpoint credentials.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The stateful payload builder.
    pub fn send_message(&mut self) -> &mut PayloadBuilder {
        &mut self.messages
    }

    /// A verifier bound to the configured verify token.
    pub fn webhook(&self) -> WebhookVerifier {
        WebhookVerifier::new(self.verify_token.clone())
    }

    /// POST a built request through the transport.
    ///
    /// Non-2xx replies come back as a [`TransportResponse`], not an error.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request could not be completed.
    pub async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, WhatsAppError> {
        let body = request.body_json()?;
        debug!(
            url = %request.url,
            message_type = request.body.message_type(),
            "sending WhatsApp message"
        );
        let response = self
            .transport
            .post(&request.url, &body, &request.headers())
            .await?;
        if !response.is_success() {
            warn!(
                code = response.code,
                message = %response.message,
                "WhatsApp API rejected message"
            );
        }
        Ok(response)
    }

    /// Build and send a text message.
    ///
    /// # Errors
    ///
    /// Returns a transport error if sending fails.
    pub async fn send_text(
        &mut self,
        message: &str,
        recipient_id: &str,
        options: &TextOptions,
    ) -> Result<TransportResponse, WhatsAppError> {
        let request = self.messages.text(message, recipient_id, options);
        self.send(&request).await
    }

    /// Build and send a template message, consuming accumulated components.
    ///
    /// # Errors
    ///
    /// Returns a transport error if sending fails.
    pub async fn send_template(
        &mut self,
        name: &str,
        recipient_id: &str,
        lang: &str,
    ) -> Result<TransportResponse, WhatsAppError> {
        let request = self.messages.template(name, recipient_id, lang);
        self.send(&request).await
    }

    /// Build and send a location message. Coordinates go out unchecked, see
    /// [`PayloadBuilder::location`].
    ///
    /// # Errors
    ///
    /// Returns a transport error if sending fails.
    pub async fn send_location(
        &mut self,
        lat: f64,
        long: f64,
        name: &str,
        address: &str,
        recipient_id: &str,
    ) -> Result<TransportResponse, WhatsAppError> {
        let request = self
            .messages
            .location(lat, long, name, address, recipient_id);
        self.send(&request).await
    }

    /// Validate, build and send a media message.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] before any I/O on bad input, or
    /// a transport error if sending fails.
    pub async fn send_media(
        &mut self,
        kind: &str,
        media: &str,
        recipient_id: &str,
        options: &MediaOptions,
    ) -> Result<TransportResponse, WhatsAppError> {
        let request = self.messages.media(kind, media, recipient_id, options)?;
        self.send(&request).await
    }

    /// Validate, build and send an interactive message.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] when `body` or `action` is
    /// missing, or a transport error if sending fails.
    pub async fn send_interactive(
        &mut self,
        button: &InteractiveButton,
        recipient_id: &str,
        kind: &str,
    ) -> Result<TransportResponse, WhatsAppError> {
        let request = self.messages.interactive(button, recipient_id, kind)?;
        self.send(&request).await
    }

    /// Send the accumulated contacts.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] when no contact was added, or a
    /// transport error if sending fails.
    pub async fn send_contacts(
        &mut self,
        recipient_id: &str,
    ) -> Result<TransportResponse, WhatsAppError> {
        let request = self.messages.contact(recipient_id)?;
        self.send(&request).await
    }

    // Webhook event accessors, see `events`.

    /// `entry[0].changes[0].value`.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn preprocess<'a>(&self, data: &'a Value) -> Result<&'a Value, WhatsAppError> {
        events::preprocess(data)
    }

    /// Sender's WhatsApp id.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_mobile(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::get_mobile(data)
    }

    /// Sender's profile name.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_name(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::get_name(data)
    }

    /// Text body of the first message.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_message(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::get_message(data)
    }

    /// Id of the first message.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_message_id(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::get_message_id(data)
    }

    /// Timestamp of the first message.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_message_timestamp(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::get_message_timestamp(data)
    }

    /// Type of the first message.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_message_type(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::get_message_type(data)
    }

    /// `list_reply` object of the first message.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_interactive_response(&self, data: &Value) -> Result<Option<Value>, WhatsAppError> {
        events::get_interactive_response(data)
    }

    /// Delivery status of the first status update.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn get_delivery(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::get_delivery(data)
    }

    /// Name of the subscription field that changed.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MalformedEvent`] if the path is absent.
    pub fn changed_field(&self, data: &Value) -> Result<Option<String>, WhatsAppError> {
        events::changed_field(data)
    }
}
