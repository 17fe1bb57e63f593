//! Integration tests for the `reqwest` transport against a local HTTP server.
//!
//! The server is a few lines of tokio: it answers each accepted connection
//! with the next canned response (`Connection: close`) and records what it
//! received. No network access beyond loopback is needed.
//!
//! Run with:
//!   cargo test --test http

use base64::{engine::general_purpose::STANDARD, Engine as _};
use pdf4me_jobs::{
    AsyncJobClient, ClientConfig, ContentKind, HttpTransport, JobOutcome, JobRequest, PollPolicy,
    Transport, TransportError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ── Test server ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

fn response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status}\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut out = out.into_bytes();
    out.extend_from_slice(body);
    out
}

/// Serve `responses` in order, one per connection. Returns the base URL.
async fn serve(responses: Vec<Vec<u8>>) -> (String, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/", listener.local_addr().unwrap());
    let log: Log = Arc::default();

    let recorded = log.clone();
    tokio::spawn(async move {
        for reply in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            if let Some(req) = read_request(&mut socket).await {
                recorded.lock().unwrap().push(req);
            }
            let _ = socket.write_all(&reply).await;
            let _ = socket.shutdown().await;
        }
    });

    (base_url, log)
}

async fn read_request(socket: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: HashMap<String, String> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(Recorded {
        method,
        path,
        headers,
        body: buf[header_end..].to_vec(),
    })
}

fn config(base_url: &str) -> ClientConfig {
    ClientConfig::builder()
        .base_url(base_url)
        .api_key("dGVzdDprZXk=")
        .request_timeout(Duration::from_secs(5))
        .connect_timeout(Duration::from_secs(2))
        .poll(PollPolicy::new(3, Duration::from_millis(10)))
        .build()
        .unwrap()
}

fn request() -> JobRequest {
    JobRequest::new(b"0123456789".to_vec(), "digits.pdf").unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_immediate_result() {
    let (base, log) = serve(vec![response(
        "200 OK",
        &[("Content-Type", "application/pdf")],
        b"%PDF-1.7",
    )])
    .await;

    let client = AsyncJobClient::new(config(&base), "/api/v2/ConvertToPdf").unwrap();
    let outcome = client.run(&request()).await;

    assert_eq!(
        outcome,
        JobOutcome::Completed {
            artifact: b"%PDF-1.7".to_vec(),
            content_kind: ContentKind::Binary,
        }
    );

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    let req = &log[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/api/v2/ConvertToPdf");
    assert_eq!(req.headers["authorization"], "Basic dGVzdDprZXk=");
    assert!(req.headers["content-type"].starts_with("application/json"));

    let body: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(body["docContent"], json!(STANDARD.encode(b"0123456789")));
    assert_eq!(body["docName"], json!("digits.pdf"));
}

#[tokio::test]
async fn test_http_deferred_result_via_relative_location() {
    let result = json!({ "docContent": STANDARD.encode(b"converted") });
    let (base, log) = serve(vec![
        response("202 Accepted", &[("Location", "/jobs/1")], b""),
        response("202 Accepted", &[], b""),
        response(
            "200 OK",
            &[("Content-Type", "application/json")],
            result.to_string().as_bytes(),
        ),
    ])
    .await;

    let client = AsyncJobClient::new(config(&base), "api/v2/ConvertToPdf").unwrap();
    let outcome = client.run(&request()).await;

    assert_eq!(outcome.artifact(), Some(&b"converted"[..]));

    let log = log.lock().unwrap();
    let gets: Vec<_> = log.iter().filter(|r| r.method == "GET").collect();
    assert_eq!(gets.len(), 2);
    for get in gets {
        assert_eq!(get.path, "/jobs/1");
        assert_eq!(get.headers["authorization"], "Basic dGVzdDprZXk=");
        assert!(get.body.is_empty());
    }
}

#[tokio::test]
async fn test_http_redirect_is_not_followed() {
    let (base, log) = serve(vec![response(
        "303 See Other",
        &[("Location", "/elsewhere")],
        b"moved",
    )])
    .await;

    let client = AsyncJobClient::new(config(&base), "api/v2/ConvertToPdf").unwrap();
    let outcome = client.run(&request()).await;

    assert_eq!(outcome.http_status(), Some(303));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_http_transport_exposes_headers() {
    let (base, _log) = serve(vec![response(
        "202 Accepted",
        &[("Location", "http://x/job/1"), ("Content-Type", "text/plain")],
        b"queued",
    )])
    .await;

    let transport = HttpTransport::new(&config(&base)).unwrap();
    let raw = transport
        .get(&format!("{base}status"), "Basic k")
        .await
        .unwrap();

    assert_eq!(raw.status, 202);
    assert_eq!(raw.location.as_deref(), Some("http://x/job/1"));
    assert_eq!(raw.content_type.as_deref(), Some("text/plain"));
    assert_eq!(raw.text(), "queued");
}

#[tokio::test]
async fn test_http_connection_refused_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let client = AsyncJobClient::new(config(&base), "api/v2/ConvertToPdf").unwrap();
    let outcome = client.run(&request()).await;

    let failure = outcome.failure().expect("expected failure");
    assert_eq!(failure.kind(), "transport");
    assert_eq!(failure.http_status(), None);
}

#[tokio::test]
async fn test_http_request_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    tokio::spawn(async move {
        // Accept and never answer.
        if let Ok((socket, _)) = listener.accept().await {
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        }
    });

    let config = ClientConfig::builder()
        .base_url(base.as_str())
        .api_key("k")
        .request_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let transport = HttpTransport::new(&config).unwrap();
    let err = transport
        .get(&format!("{base}status"), "Basic k")
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::Timeout(Duration::from_millis(200)));
}
