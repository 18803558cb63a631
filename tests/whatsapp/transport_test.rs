//! `HttpTransport` against a one-shot local server.

use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use wacloud::whatsapp::transport::{HttpTransport, Transport};

/// Serve one response and hand back the raw request text.
async fn serve_once(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");

    let addr = listener.local_addr().expect("listener should expose local addr");

    let (tx, rx) = oneshot::channel();
    let status_line_owned = status_line.to_owned();
    let body_owned = body.to_owned();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;

            let response = format!(
                "HTTP/1.1 {status_line_owned}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body_owned}",
                body_owned.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(request);
        }
    });

    (format!("http://{addr}/v16.0/123/messages"), rx)
}

/// Read until the headers and `Content-Length` bytes of body have arrived.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        raw.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&raw).into_owned();
        if let Some(split) = text.find("\r\n\r\n") {
            let content_length = text[..split]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if text.len() >= split + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(2), Duration::from_secs(5))
}

fn headers() -> Vec<(String, String)> {
    vec![
        ("Authorization".to_owned(), "Bearer test-token".to_owned()),
        ("Content-Type".to_owned(), "application/json".to_owned()),
    ]
}

#[tokio::test]
async fn post_sends_json_with_headers_and_parses_reply() {
    let (url, request_rx) = serve_once(
        "200 OK",
        r#"{"messaging_product":"whatsapp","messages":[{"id":"wamid.1"}]}"#,
    )
    .await;

    let body = json!({ "messaging_product": "whatsapp", "to": "123", "type": "text" });
    let response = transport()
        .post(&url, &body, &headers())
        .await
        .expect("post should complete");

    assert_eq!(response.code, 200);
    assert_eq!(response.message, "OK");
    assert_eq!(
        response.body.as_ref().and_then(|b| b.pointer("/messages/0/id")),
        Some(&json!("wamid.1"))
    );

    let raw = request_rx.await.expect("server should capture request");
    let lower = raw.to_ascii_lowercase();
    assert!(raw.starts_with("POST /v16.0/123/messages"));
    assert!(lower.contains("authorization: bearer test-token"));
    assert!(lower.contains("content-type: application/json"));
    assert!(raw.contains(r#""messaging_product":"whatsapp""#));
}

#[tokio::test]
async fn error_status_is_a_response_not_an_error() {
    let (url, _rx) = serve_once(
        "401 Unauthorized",
        r#"{"error":{"message":"Error validating access token","type":"OAuthException","code":190}}"#,
    )
    .await;

    let response = transport()
        .post(&url, &json!({}), &headers())
        .await
        .expect("non-2xx should not be a transport error");
    assert_eq!(response.code, 401);
    assert!(!response.is_success());
    assert_eq!(response.message, "Error validating access token");
}

#[tokio::test]
async fn get_sends_query_parameters() {
    let (url, request_rx) = serve_once("200 OK", "{}").await;

    let query = vec![("fields".to_owned(), "id,name".to_owned())];
    let result = transport().get(&url, &query, &headers()).await;
    assert!(result.is_ok());

    let raw = request_rx.await.expect("server should capture request");
    assert!(raw.starts_with("GET /v16.0/123/messages?fields=id%2Cname"));
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should expose local addr");
    drop(listener);

    let result = transport()
        .delete(&format!("http://{addr}/x"), &json!({}), &headers())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn with_client_keeps_caller_configuration() {
    let (url, request_rx) = serve_once("200 OK", "{}").await;

    let client = reqwest::Client::builder()
        .user_agent("wacloud-test/1.0")
        .build()
        .expect("client should build");
    let result = HttpTransport::with_client(client)
        .post(&url, &json!({ "to": "123" }), &headers())
        .await;
    assert!(matches!(result, Ok(ref response) if response.is_success()));

    let raw = request_rx.await.expect("server should capture request");
    assert!(raw
        .to_ascii_lowercase()
        .contains("user-agent: wacloud-test/1.0"));
}
