//! Outbound message payloads and the stateful [`PayloadBuilder`].
//!
//! Every builder returns an [`OutboundRequest`]: the JSON body, the
//! `/messages` URL and the bearer header. Template components and contacts
//! accumulate across calls and are consumed by the next `template` /
//! `contact` build.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;

use super::contacts::normalize_contact;
use super::interactive::{create_interaction, InteractiveButton, Interaction};
use super::WhatsAppError;

/// Value of `messaging_product` on every outbound body.
pub const MESSAGING_PRODUCT: &str = "whatsapp";

/// Default `recipient_type`.
pub const DEFAULT_RECIPIENT_TYPE: &str = "individual";

/// Default template language code.
pub const DEFAULT_LANGUAGE: &str = "en_US";

/// Default interactive message type.
pub const DEFAULT_INTERACTIVE_TYPE: &str = "list";

const MESSAGES_PATH: &str = "/messages";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A complete outbound message body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    /// Always [`MESSAGING_PRODUCT`].
    pub messaging_product: &'static str,
    /// Set for text and media messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_type: Option<String>,
    /// Recipient id.
    pub to: String,
    /// Type tag plus the type-specific object.
    #[serde(flatten)]
    pub content: MessageContent,
}

impl OutboundMessage {
    fn new(to: &str, recipient_type: Option<&str>, content: MessageContent) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            recipient_type: recipient_type.map(str::to_owned),
            to: to.to_owned(),
            content,
        }
    }

    /// The `type` tag this body serializes with.
    pub fn message_type(&self) -> &'static str {
        self.content.message_type()
    }
}

/// Per-type message content, serialized as `{"type": ..., "<type>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    /// Plain text.
    Text {
        /// Text object.
        text: TextBody,
    },
    /// Pre-approved template.
    Template {
        /// Template object.
        template: TemplateBody,
    },
    /// Map pin.
    Location {
        /// Location object.
        location: LocationBody,
    },
    /// Image by link or media id.
    Image {
        /// Media object.
        image: MediaBody,
    },
    /// Audio by link or media id.
    Audio {
        /// Media object.
        audio: MediaBody,
    },
    /// Video by link or media id.
    Video {
        /// Media object.
        video: MediaBody,
    },
    /// Document by link or media id.
    Document {
        /// Media object.
        document: MediaBody,
    },
    /// Sticker by link or media id.
    Sticker {
        /// Media object.
        sticker: MediaBody,
    },
    /// List or button message.
    Interactive {
        /// Interaction object.
        interactive: Interaction,
    },
    /// Contact cards.
    Contacts {
        /// Normalized contact records.
        contacts: Vec<Value>,
    },
}

impl MessageContent {
    /// The `type` tag.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Template { .. } => "template",
            Self::Location { .. } => "location",
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
            Self::Video { .. } => "video",
            Self::Document { .. } => "document",
            Self::Sticker { .. } => "sticker",
            Self::Interactive { .. } => "interactive",
            Self::Contacts { .. } => "contacts",
        }
    }
}

/// `text` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBody {
    /// Render a link preview for the first URL.
    pub preview_url: bool,
    /// Message text.
    pub body: String,
}

/// `template` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateBody {
    /// Template name.
    pub name: String,
    /// Language selector.
    pub language: TemplateLanguage,
    /// Parameter blocks, omitted when none were accumulated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Value>>,
}

/// `template.language` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateLanguage {
    /// Language code, e.g. `en_US`.
    pub code: String,
}

/// `location` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationBody {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Place name.
    pub name: String,
    /// Street address.
    pub address: String,
}

/// Media object shared by all media types. Exactly one of `link`/`id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaBody {
    /// Public http(s) URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Pre-uploaded media id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Image/video caption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Document file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Supported media message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// `audio`
    Audio,
    /// `document`
    Document,
    /// `image`
    Image,
    /// `sticker`
    Sticker,
    /// `video`
    Video,
}

impl MediaKind {
    /// Every supported kind.
    pub const ALL: [MediaKind; 5] = [
        MediaKind::Audio,
        MediaKind::Document,
        MediaKind::Image,
        MediaKind::Sticker,
        MediaKind::Video,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Image => "image",
            Self::Sticker => "sticker",
            Self::Video => "video",
        }
    }

    /// Only images and videos carry captions.
    pub fn accepts_caption(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }

    /// Only documents carry file names.
    pub fn accepts_filename(self) -> bool {
        matches!(self, Self::Document)
    }

    fn wrap(self, media: MediaBody) -> MessageContent {
        match self {
            Self::Audio => MessageContent::Audio { audio: media },
            Self::Document => MessageContent::Document { document: media },
            Self::Image => MessageContent::Image { image: media },
            Self::Sticker => MessageContent::Sticker { sticker: media },
            Self::Video => MessageContent::Video { video: media },
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = WhatsAppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| WhatsAppError::Validation(format!("unsupported media type: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A built message ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    /// `{api_base_uri}/messages`.
    pub url: String,
    /// Message body.
    pub body: OutboundMessage,
    /// `Bearer <token>`.
    pub authorization: String,
}

impl OutboundRequest {
    /// Headers to send alongside the body.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_owned(), self.authorization.clone()),
            ("Content-Type".to_owned(), "application/json".to_owned()),
        ]
    }

    /// The body as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Json`] if encoding fails.
    pub fn body_json(&self) -> Result<Value, WhatsAppError> {
        Ok(serde_json::to_value(&self.body)?)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Options for [`PayloadBuilder::text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// `recipient_type`, default `individual`.
    pub recipient_type: String,
    /// Link preview, default on.
    pub preview_url: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            recipient_type: DEFAULT_RECIPIENT_TYPE.to_owned(),
            preview_url: true,
        }
    }
}

/// Options for [`PayloadBuilder::media`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaOptions {
    /// `recipient_type`, default `individual`.
    pub recipient_type: String,
    /// `true`: `media` is a URL; `false`: a pre-uploaded media id.
    pub link: bool,
    /// Caption for images and videos.
    pub caption: Option<String>,
    /// File name for documents.
    pub filename: Option<String>,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            recipient_type: DEFAULT_RECIPIENT_TYPE.to_owned(),
            link: true,
            caption: None,
            filename: None,
        }
    }
}

/// Builds outbound message requests for one phone number.
///
/// Not meant to be shared between concurrent senders: the component and
/// contact accumulators belong to a single add-then-send cycle.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    config: Config,
    components: Vec<Value>,
    contacts: Vec<Value>,
}

impl PayloadBuilder {
    /// A builder with empty accumulators.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            components: Vec::new(),
            contacts: Vec::new(),
        }
    }

    /// Pending template components.
    pub fn components(&self) -> &[Value] {
        &self.components
    }

    /// Pending contacts.
    pub fn contacts(&self) -> &[Value] {
        &self.contacts
    }

    fn finish(&self, body: OutboundMessage) -> OutboundRequest {
        debug!(message_type = body.message_type(), to = %body.to, "built WhatsApp payload");
        OutboundRequest {
            url: self.config.api_uri(MESSAGES_PATH),
            body,
            authorization: self.config.bearer(),
        }
    }

    /// Text message.
    pub fn text(&self, message: &str, recipient_id: &str, options: &TextOptions) -> OutboundRequest {
        let content = MessageContent::Text {
            text: TextBody {
                preview_url: options.preview_url,
                body: message.to_owned(),
            },
        };
        self.finish(OutboundMessage::new(
            recipient_id,
            Some(&options.recipient_type),
            content,
        ))
    }

    /// Template message. Takes and clears any accumulated components.
    pub fn template(&mut self, name: &str, recipient_id: &str, lang: &str) -> OutboundRequest {
        let components = if self.components.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.components))
        };
        let content = MessageContent::Template {
            template: TemplateBody {
                name: name.to_owned(),
                language: TemplateLanguage {
                    code: lang.to_owned(),
                },
                components,
            },
        };
        self.finish(OutboundMessage::new(recipient_id, None, content))
    }

    /// Queue template components for the next [`PayloadBuilder::template`].
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] when `components` is empty.
    pub fn add_component<I>(&mut self, components: I) -> Result<&[Value], WhatsAppError>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut added = components.into_iter().peekable();
        if added.peek().is_none() {
            return Err(WhatsAppError::Validation(
                "add_component needs at least one component".to_owned(),
            ));
        }
        self.components.extend(added);
        Ok(&self.components)
    }

    /// Location message.
    ///
    /// Coordinates are not range-checked. A NaN or infinite value encodes as
    /// JSON `null` and the API rejects the message on its side.
    pub fn location(
        &self,
        lat: f64,
        long: f64,
        name: &str,
        address: &str,
        recipient_id: &str,
    ) -> OutboundRequest {
        let content = MessageContent::Location {
            location: LocationBody {
                latitude: lat,
                longitude: long,
                name: name.to_owned(),
                address: address.to_owned(),
            },
        };
        self.finish(OutboundMessage::new(recipient_id, None, content))
    }

    /// Media message of type `kind`.
    ///
    /// With `options.link` the media must be an absolute `http`/`https` URL;
    /// otherwise it is passed through as a media id. Captions apply to images
    /// and videos, file names to documents; both are dropped when empty.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] for an unsupported type or a
    /// link that is not an http(s) URL.
    pub fn media(
        &self,
        kind: &str,
        media: &str,
        recipient_id: &str,
        options: &MediaOptions,
    ) -> Result<OutboundRequest, WhatsAppError> {
        let kind: MediaKind = kind.parse()?;

        if options.link {
            validate_media_link(media)?;
        }

        let caption = options
            .caption
            .as_deref()
            .filter(|c| !c.is_empty() && kind.accepts_caption())
            .map(str::to_owned);
        let filename = options
            .filename
            .as_deref()
            .filter(|f| !f.is_empty() && kind.accepts_filename())
            .map(str::to_owned);

        let body = MediaBody {
            link: options.link.then(|| media.to_owned()),
            id: (!options.link).then(|| media.to_owned()),
            caption,
            filename,
        };

        Ok(self.finish(OutboundMessage::new(
            recipient_id,
            Some(&options.recipient_type),
            kind.wrap(body),
        )))
    }

    /// Validate, normalize and queue contacts for the next
    /// [`PayloadBuilder::contact`].
    ///
    /// Either all contacts are queued or none are.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] when `contacts` is empty or any
    /// contact is malformed.
    pub fn add_contact<I>(&mut self, contacts: I) -> Result<&[Value], WhatsAppError>
    where
        I: IntoIterator<Item = Value>,
    {
        let normalized = contacts
            .into_iter()
            .map(|contact| normalize_contact(&contact))
            .collect::<Result<Vec<_>, _>>()?;
        if normalized.is_empty() {
            return Err(WhatsAppError::Validation(
                "add_contact needs at least one contact".to_owned(),
            ));
        }
        self.contacts.extend(normalized);
        Ok(&self.contacts)
    }

    /// Contacts message. Takes and clears the accumulated contacts.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] when no contact was queued.
    pub fn contact(&mut self, recipient_id: &str) -> Result<OutboundRequest, WhatsAppError> {
        if self.contacts.is_empty() {
            return Err(WhatsAppError::Validation(
                "no contacts queued, call add_contact first".to_owned(),
            ));
        }
        let content = MessageContent::Contacts {
            contacts: std::mem::take(&mut self.contacts),
        };
        Ok(self.finish(OutboundMessage::new(recipient_id, None, content)))
    }

    /// See [`create_interaction`].
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] when `body` or `action` is missing.
    pub fn create_interaction(
        &self,
        button: &InteractiveButton,
        kind: &str,
    ) -> Result<Interaction, WhatsAppError> {
        create_interaction(button, kind)
    }

    /// Interactive message of type `kind` (`list`, `button`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Validation`] when `body` or `action` is missing.
    pub fn interactive(
        &self,
        button: &InteractiveButton,
        recipient_id: &str,
        kind: &str,
    ) -> Result<OutboundRequest, WhatsAppError> {
        let interactive = create_interaction(button, kind)?;
        Ok(self.finish(OutboundMessage::new(
            recipient_id,
            None,
            MessageContent::Interactive { interactive },
        )))
    }
}

fn validate_media_link(media: &str) -> Result<(), WhatsAppError> {
    let parsed = url::Url::parse(media)
        .map_err(|e| WhatsAppError::Validation(format!("media link is not a URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(WhatsAppError::Validation(format!(
            "media link scheme must be http or https, got {other}"
        ))),
    }
}
