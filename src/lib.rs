//! wacloud: client SDK for the WhatsApp Cloud messaging API.
//!
//! Builds JSON bodies for outbound messages (text, template, media,
//! location, interactive, contacts), verifies webhook subscription
//! handshakes, and reads fields out of inbound webhook events. Network I/O
//! goes through a pluggable [`whatsapp::transport::Transport`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;

pub mod whatsapp;
