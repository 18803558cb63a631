//! wacloud CLI entry point.
//!
//! Sends single messages through the Cloud API and runs the webhook
//! handshake offline. Settings come from `~/.wacloud/config.toml`, the
//! `.env` credentials file and `WHATSAPP_*` env vars.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};

use wacloud::config::SdkConfig;
use wacloud::credentials::{load_credentials, load_default_credentials};
use wacloud::logging;
use wacloud::whatsapp::messages::{
    MediaOptions, OutboundRequest, TextOptions, DEFAULT_LANGUAGE, DEFAULT_RECIPIENT_TYPE,
};
use wacloud::whatsapp::transport::HttpTransport;
use wacloud::whatsapp::webhook::{WebhookHandshake, WebhookVerifier};
use wacloud::whatsapp::Whatsapp;

/// wacloud: WhatsApp Cloud API client.
#[derive(Parser)]
#[command(name = "wacloud", version, about)]
struct Cli {
    /// Settings file (default: `~/.wacloud/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Credentials `.env` file (default: `~/.wacloud/.env`).
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Also write JSON logs with daily rotation into this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Print the request instead of sending it.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Send a text message.
    Text {
        /// Recipient id.
        to: String,
        /// Message text.
        message: String,
        /// Disable the link preview.
        #[arg(long)]
        no_preview: bool,
    },
    /// Send a template message.
    Template {
        /// Recipient id.
        to: String,
        /// Template name.
        name: String,
        /// Template language code.
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        lang: String,
        /// Bind a header component with one text parameter.
        #[arg(long)]
        header_text: Option<String>,
    },
    /// Send an audio, document, image, sticker or video message.
    Media {
        /// Media type.
        kind: String,
        /// Recipient id.
        to: String,
        /// Media URL, or media id with `--id`.
        media: String,
        /// Treat `media` as a pre-uploaded media id.
        #[arg(long)]
        id: bool,
        /// Caption (image and video only).
        #[arg(long)]
        caption: Option<String>,
        /// File name (document only).
        #[arg(long)]
        filename: Option<String>,
    },
    /// Send a location pin.
    Location {
        /// Recipient id.
        to: String,
        /// Latitude.
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude.
        #[arg(allow_hyphen_values = true)]
        long: f64,
        /// Place name.
        name: String,
        /// Street address.
        address: String,
    },
    /// Check a webhook handshake query string against the verify token.
    Verify {
        /// Raw query, e.g. `hub.mode=subscribe&hub.verify_token=T&hub.challenge=42`.
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let credentials = match cli.env_file.as_deref() {
        Some(path) => load_credentials(path)?,
        None => load_default_credentials()?,
    };
    let settings =
        SdkConfig::load(cli.config.as_deref(), &credentials).context("failed to load settings")?;

    let _logging_guard = logging::init(&settings.logging.level, cli.log_dir.as_deref())?;
    debug!(?settings, "settings resolved");

    match cli.command {
        Command::Verify { query } => handle_verify(&settings, &query),
        command => handle_send(&settings, command, cli.dry_run).await,
    }
}

/// Run the handshake and print status plus body.
fn handle_verify(settings: &SdkConfig, query: &str) -> anyhow::Result<()> {
    let verifier = WebhookVerifier::new(settings.whatsapp.verify_token.clone().unwrap_or_default());
    let outcome = verifier.verify(&WebhookHandshake::from_query(query));
    let status = outcome.status();

    println!("{status}");
    if let Some(body) = outcome.body() {
        println!("{body}");
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("webhook handshake rejected with {status}"))
    }
}

/// Build one message and either print or send it.
async fn handle_send(settings: &SdkConfig, command: Command, dry_run: bool) -> anyhow::Result<()> {
    let endpoint = settings
        .endpoint()
        .context("set WHATSAPP_PHONE_NUMBER_ID and WHATSAPP_ACCESS_TOKEN")?;
    let transport = HttpTransport::new(
        Duration::from_secs(settings.http.connect_timeout_secs),
        Duration::from_secs(settings.http.request_timeout_secs),
    );
    let mut wa = Whatsapp::with_transport(endpoint, Arc::new(transport));

    let request = build_request(&mut wa, command)?;

    if dry_run {
        let preview = json!({ "url": request.url, "body": request.body_json()? });
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    let response = wa.send(&request).await?;
    info!(code = response.code, "message submitted");
    println!("{} {}", response.code, response.message);
    if let Some(body) = &response.body {
        println!("{}", serde_json::to_string_pretty(body)?);
    }

    if response.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "WhatsApp API returned {}: {}",
            response.code,
            response.message
        ))
    }
}

fn build_request(wa: &mut Whatsapp, command: Command) -> anyhow::Result<OutboundRequest> {
    let builder = wa.send_message();
    let request = match command {
        Command::Text {
            to,
            message,
            no_preview,
        } => builder.text(
            &message,
            &to,
            &TextOptions {
                preview_url: !no_preview,
                ..TextOptions::default()
            },
        ),
        Command::Template {
            to,
            name,
            lang,
            header_text,
        } => {
            if let Some(text) = header_text {
                builder.add_component([json!({
                    "type": "header",
                    "parameters": [{ "type": "text", "text": text }],
                })])?;
            }
            builder.template(&name, &to, &lang)
        }
        Command::Media {
            kind,
            to,
            media,
            id,
            caption,
            filename,
        } => builder.media(
            &kind,
            &media,
            &to,
            &MediaOptions {
                recipient_type: DEFAULT_RECIPIENT_TYPE.to_owned(),
                link: !id,
                caption,
                filename,
            },
        )?,
        Command::Location {
            to,
            lat,
            long,
            name,
            address,
        } => builder.location(lat, long, &name, &address, &to),
        Command::Verify { .. } => {
            return Err(anyhow::anyhow!("verify does not build a message"));
        }
    };
    Ok(request)
}
