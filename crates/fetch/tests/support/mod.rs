//! A small HTTP/1.1 server for the integration tests.
//!
//! Routes:
//! - `/delay/{ms}` answers `200` with body `ok` after `ms` milliseconds
//! - `/status/{code}` answers with `code` and an empty body
//! - `/echo` answers a JSON document with the method, path, headers and body it received
//! - `/gzip` answers a gzip encoded body
//! - `/chunked` answers with chunked transfer encoding
//! - `/close` answers without framing headers and closes the connection
//! - anything else is `404`

#![allow(dead_code, reason = "each test binary uses a different subset")]

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Map, Value, json};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Once;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

pub const GZIP_TEXT: &str = "compressed hello from the test server";

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).with_test_writer().finish();
        // another test binary may already own the global default
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    pub async fn start() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                tokio::spawn(serve(stream));
            }
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

struct Received {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

async fn serve(mut stream: TcpStream) {
    let Some(received) = read_request(&mut stream).await else { return };
    debug!(method = %received.method, path = %received.path, "test server got request");

    let path = received.path.split('?').next().unwrap_or_default().to_string();
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match segments.as_slice() {
        ["delay", ms] => {
            let ms = ms.parse().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(ms)).await;
            respond(&mut stream, 200, &[("content-type", "text/plain")], b"ok").await;
        }
        ["status", code] => {
            respond(&mut stream, code.parse().unwrap_or(500), &[], b"").await;
        }
        ["echo"] => {
            let body = serde_json::to_vec(&echo(&received)).unwrap();
            respond(&mut stream, 200, &[("content-type", "application/json")], &body).await;
        }
        ["gzip"] => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(GZIP_TEXT.as_bytes()).unwrap();
            let body = encoder.finish().unwrap();
            respond(&mut stream, 200, &[("content-encoding", "gzip")], &body).await;
        }
        ["chunked"] => {
            let raw = "HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
            let _ = stream.write_all(raw.as_bytes()).await;
        }
        ["close"] => {
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nconnection: close\r\n\r\nuntil the end").await;
        }
        _ => respond(&mut stream, 404, &[], b"not found").await,
    }

    let _ = stream.shutdown().await;
}

fn echo(received: &Received) -> Value {
    let mut headers = Map::new();
    for (name, value) in &received.headers {
        headers.insert(name.to_ascii_lowercase(), Value::String(value.clone()));
    }
    json!({
        "method": received.method,
        "path": received.path,
        "headers": headers,
        "body": String::from_utf8_lossy(&received.body),
    })
}

async fn read_request(stream: &mut TcpStream) -> Option<Received> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut request = httparse::Request::new(&mut headers);
        let httparse::Status::Complete(head_len) = request.parse(&buf).ok()? else { continue };

        let method = request.method?.to_string();
        let path = request.path?.to_string();
        let headers: Vec<(String, String)> = request
            .headers
            .iter()
            .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
            .collect();

        let content_length = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = buf[head_len..].to_vec();
        while body.len() < content_length {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(content_length);

        return Some(Received { method, path, headers, body });
    }
}

async fn respond(stream: &mut TcpStream, status: u16, headers: &[(&str, &str)], body: &[u8]) {
    let mut out = format!("HTTP/1.1 {status} {}\r\n", reason(status));
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!("content-length: {}\r\nconnection: close\r\n\r\n", body.len()));

    let mut bytes = out.into_bytes();
    bytes.extend_from_slice(body);
    let _ = stream.write_all(&bytes).await;
}

fn reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status).ok().and_then(|s| s.canonical_reason()).unwrap_or("Unknown")
}
