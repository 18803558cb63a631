//! Entry facade: config validation, sending through an injected transport.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use wacloud::config::Config;
use wacloud::whatsapp::messages::{MediaOptions, TextOptions, DEFAULT_LANGUAGE};
use wacloud::whatsapp::transport::{Transport, TransportResponse};
use wacloud::whatsapp::{FailSoft, WhatsAppError, Whatsapp};

/// One recorded POST.
#[derive(Debug, Clone)]
struct Call {
    url: String,
    body: Value,
    headers: Vec<(String, String)>,
}

/// Records calls and replies with a fixed response.
#[derive(Default)]
struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
}

impl RecordingTransport {
    fn calls(&self) -> Vec<Call> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, url: &str, body: &Value, headers: &[(String, String)]) {
        let call = Call {
            url: url.to_owned(),
            body: body.clone(),
            headers: headers.to_vec(),
        };
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get(
        &self,
        url: &str,
        _query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        self.record(url, &Value::Null, headers);
        Ok(TransportResponse::from_parts(200, Some("OK"), "{}"))
    }

    async fn post(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        self.record(url, body, headers);
        Ok(TransportResponse::from_parts(
            200,
            Some("OK"),
            r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.OUT"}]}"#,
        ))
    }

    async fn delete(
        &self,
        url: &str,
        body: &Value,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        self.record(url, body, headers);
        Ok(TransportResponse::from_parts(200, Some("OK"), "{}"))
    }
}

fn facade() -> (Whatsapp, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let config = Config::new("1234567890", "test-token", "v16.0").expect("config should build");
    let wa = Whatsapp::with_transport(config, transport.clone()).with_verify_token("verify-secret");
    (wa, transport)
}

#[test]
fn empty_credentials_are_config_errors() {
    assert!(matches!(
        Whatsapp::from_parts("", "token", "v14.0"),
        Err(WhatsAppError::Config(_))
    ));
    assert!(matches!(
        Whatsapp::from_parts("123", "", "v14.0"),
        Err(WhatsAppError::Config(_))
    ));
}

#[test]
fn config_derives_urls_and_hides_token() {
    let config =
        Config::with_defaults("1234567890", "secret-token").expect("config should build");
    assert_eq!(config.api_version(), "v14.0");
    assert_eq!(
        config.api_base_uri(),
        "https://graph.facebook.com/v14.0/1234567890"
    );
    assert_eq!(
        config.api_uri("/media"),
        "https://graph.facebook.com/v14.0/1234567890/media"
    );
    assert!(!format!("{config:?}").contains("secret-token"));
}

#[tokio::test]
async fn send_text_posts_body_with_bearer_header() {
    let (mut wa, transport) = facade();
    let response = wa
        .send_text("hello", "123", &TextOptions::default())
        .await
        .expect("send should succeed");
    assert!(response.is_success());
    assert_eq!(
        response.body.as_ref().and_then(|b| b.pointer("/messages/0/id")),
        Some(&json!("wamid.OUT"))
    );

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].url,
        "https://graph.facebook.com/v16.0/1234567890/messages"
    );
    assert_eq!(calls[0].body["text"]["body"], "hello");
    assert!(calls[0]
        .headers
        .contains(&("Authorization".to_owned(), "Bearer test-token".to_owned())));
}

#[tokio::test]
async fn validation_failure_never_reaches_transport() {
    let (mut wa, transport) = facade();
    let result = wa
        .send_media("image", "ftp://x/y.png", "123", &MediaOptions::default())
        .await;
    assert!(matches!(result, Err(WhatsAppError::Validation(_))));

    let contacts = wa.send_contacts("123").await;
    assert!(matches!(contacts, Err(WhatsAppError::Validation(_))));

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn send_template_consumes_components_added_through_facade() {
    let (mut wa, transport) = facade();
    let header = json!({ "type": "header", "parameters": [{ "type": "text", "text": "Ana" }] });
    assert!(wa.send_message().add_component([header.clone()]).is_ok());

    assert!(wa.send_template("template_id", "123", "ES").await.is_ok());
    assert!(wa.send_template("template_id", "123", DEFAULT_LANGUAGE).await.is_ok());

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].body["template"]["components"], json!([header]));
    assert!(calls[1].body["template"].get("components").is_none());
}

#[tokio::test]
async fn send_location_posts_coordinates() {
    let (mut wa, transport) = facade();
    assert!(wa
        .send_location(19.4326, -99.1332, "Zócalo", "Centro, CDMX", "123")
        .await
        .is_ok());
    let calls = transport.calls();
    assert_eq!(calls[0].body["location"]["longitude"], json!(-99.1332));
}

#[test]
fn fail_soft_logs_and_discards() {
    let (mut wa, _transport) = facade();
    let soft = wa
        .send_message()
        .media("carousel", "https://x/y", "123", &MediaOptions::default())
        .or_log();
    assert!(soft.is_none());

    let ok = wa
        .send_message()
        .media("image", "https://x/y.png", "123", &MediaOptions::default())
        .or_log();
    assert!(ok.is_some());
}

#[test]
fn facade_verifier_uses_configured_token() {
    let (wa, _transport) = facade();
    let query = wacloud::whatsapp::webhook::parse_query(
        "hub.mode=subscribe&hub.verify_token=verify-secret&hub.challenge=7",
    );
    assert_eq!(wa.webhook().connect(&query).body().as_deref(), Some("7"));
}

#[test]
fn facade_extractors_delegate_to_events() {
    let (wa, _transport) = facade();
    let event = json!({
        "entry": [{ "changes": [{
            "field": "messages",
            "value": { "statuses": [{ "status": "sent" }] },
        }] }],
    });
    assert!(matches!(wa.get_delivery(&event), Ok(Some(ref s)) if s == "sent"));
    assert!(matches!(wa.get_mobile(&event), Ok(None)));
    assert!(matches!(wa.changed_field(&event), Ok(Some(ref f)) if f == "messages"));
    assert!(wa.preprocess(&json!({})).is_err());
}

/// Fails every call the way a non-HTTP transport would.
struct UnreachableTransport;

#[async_trait]
impl Transport for UnreachableTransport {
    async fn get(
        &self,
        _url: &str,
        _query: &[(String, String)],
        _headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        Err(WhatsAppError::Transport("queue offline".to_owned()))
    }

    async fn post(
        &self,
        _url: &str,
        _body: &Value,
        _headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        Err(WhatsAppError::Transport("queue offline".to_owned()))
    }

    async fn delete(
        &self,
        _url: &str,
        _body: &Value,
        _headers: &[(String, String)],
    ) -> Result<TransportResponse, WhatsAppError> {
        Err(WhatsAppError::Transport("queue offline".to_owned()))
    }
}

#[tokio::test]
async fn transport_failure_is_passed_through_unchanged() {
    let config = Config::new("1234567890", "test-token", "v16.0").expect("config should build");
    let mut wa = Whatsapp::with_transport(config, Arc::new(UnreachableTransport));

    let result = wa.send_text("hello", "123", &TextOptions::default()).await;
    assert!(matches!(
        result,
        Err(WhatsAppError::Transport(ref reason)) if reason == "queue offline"
    ));

    let request = wa
        .send_message()
        .text("again", "123", &TextOptions::default());
    assert!(matches!(
        wa.send(&request).await,
        Err(WhatsAppError::Transport(_))
    ));
}
