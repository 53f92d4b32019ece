mod support;

use http::StatusCode;
use micro_fetch::{Client, ClientOptions, TransferError, TransferRequest};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use support::{GZIP_TEXT, TestServer};

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn calls_run_concurrently() {
    let server = TestServer::start().await;
    let client = Client::new();

    let started = Instant::now();
    let mut first = client.get(server.url("/delay/400")).unwrap();
    let mut second = client.get(server.url("/delay/400")).unwrap();
    assert!(started.elapsed() < Duration::from_millis(100));

    assert_eq!(first.text().await.unwrap(), "ok");
    assert_eq!(second.text().await.unwrap(), "ok");
    assert!(started.elapsed() < Duration::from_millis(750), "took {:?}", started.elapsed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn timeout_fails_the_response() {
    let server = TestServer::start().await;
    let client = Client::with_options(json!({ "timeoutMs": 100 })).unwrap();

    let started = Instant::now();
    let mut resp = client.get(server.url("/delay/1000")).unwrap();
    let err = resp.status().await.unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_millis(900));
    // the failure sticks
    assert!(resp.body().await.unwrap_err().is_timeout());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn error_statuses_are_responses() {
    let server = TestServer::start().await;
    let client = Client::new();

    let mut missing = client.get(server.url("/nowhere")).unwrap();
    assert_eq!(missing.status().await.unwrap(), StatusCode::NOT_FOUND);
    assert_eq!(missing.text().await.unwrap(), "not found");

    let mut broken = client.delete(server.url("/status/503")).unwrap();
    assert_eq!(broken.status().await.unwrap(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn structured_bodies_follow_the_content_type() {
    let server = TestServer::start().await;
    let client = Client::new();

    let mut form = client.post(server.url("/echo"), json!({ "name": "micro", "n": 1 })).unwrap();
    let echoed: Value = form.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["headers"]["content-type"], "application/x-www-form-urlencoded");
    let fields: HashMap<String, String> = serde_urlencoded::from_str(echoed["body"].as_str().unwrap()).unwrap();
    assert_eq!(fields["name"], "micro");
    assert_eq!(fields["n"], "1");

    let options = json!({ "headers": ["Content-Type: application/json"] });
    let mut json_body = client.put_with(server.url("/echo"), json!({ "name": "micro" }), options).unwrap();
    let echoed: Value = json_body.json().await.unwrap();
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(serde_json::from_str::<Value>(echoed["body"].as_str().unwrap()).unwrap(), json!({ "name": "micro" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn response_is_read_once() {
    let server = TestServer::start().await;
    let client = Client::new();

    let mut resp = client.get(server.url("/echo")).unwrap();
    let first = resp.body().await.unwrap();
    assert!(!resp.is_pending());

    let second = resp.body().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(resp.header_line("content-type").await.unwrap(), "application/json");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn bodies_in_every_framing() {
    let server = TestServer::start().await;
    let client = Client::new();

    let mut gzip = client.get(server.url("/gzip")).unwrap();
    assert_eq!(gzip.text().await.unwrap(), GZIP_TEXT);
    assert!(gzip.headers().await.unwrap().get("content-encoding").is_none());

    let raw = client.get_with(server.url("/gzip"), ClientOptions::new().with_decode_content(false)).unwrap();
    let raw = raw.await.unwrap();
    assert_eq!(raw.headers().get("content-encoding").unwrap(), "gzip");
    assert_ne!(raw.body().as_ref(), GZIP_TEXT.as_bytes());

    let mut chunked = client.get(server.url("/chunked")).unwrap();
    assert_eq!(chunked.text().await.unwrap(), "hello world");

    let mut close = client.get(server.url("/close")).unwrap();
    assert_eq!(close.text().await.unwrap(), "until the end");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn transport_failures_surface_on_access() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new();
    let mut refused = client.get(format!("http://{addr}/")).unwrap();
    assert!(matches!(refused.status().await, Err(TransferError::Connect { .. })));

    let mut https = client.get("https://localhost/").unwrap();
    assert!(matches!(https.status().await, Err(TransferError::UnsupportedScheme { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn defaults_and_overrides_reach_the_wire() {
    let server = TestServer::start().await;
    let defaults = ClientOptions::new().with_header("X-Client: micro").with_cookie("session=abc").with_user_agent("micro-fetch-test");
    let client = Client::with_options(defaults).unwrap();

    let mut plain = client.get(server.url("/echo")).unwrap();
    let echoed: Value = plain.json().await.unwrap();
    assert_eq!(echoed["headers"]["x-client"], "micro");
    assert_eq!(echoed["headers"]["cookie"], "session=abc");
    assert_eq!(echoed["headers"]["user-agent"], "micro-fetch-test");

    // headers are replaced as a whole, the rest is inherited
    let mut overridden = client.get_with(server.url("/echo"), json!({ "headers": ["X-Call: 1"], "userAgent": "other" })).unwrap();
    let echoed: Value = overridden.json().await.unwrap();
    assert_eq!(echoed["headers"]["x-call"], "1");
    assert!(echoed["headers"].get("x-client").is_none());
    assert_eq!(echoed["headers"]["user-agent"], "other");
    assert_eq!(echoed["headers"]["cookie"], "session=abc");

    assert_eq!(client.options().user_agent(), Some("micro-fetch-test"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn send_request_uses_the_same_engine() {
    let server = TestServer::start().await;
    let client = Client::with_options(ClientOptions::new().with_user_agent("sender")).unwrap();

    let request = http::Request::post(server.url("/echo")).header("x-raw", "yes").body(bytes::Bytes::from_static(b"raw body")).unwrap();
    let mut resp = client.send_request(TransferRequest::from(request)).unwrap();

    let echoed: Value = resp.json().await.unwrap();
    assert_eq!(echoed["headers"]["x-raw"], "yes");
    assert_eq!(echoed["headers"]["user-agent"], "sender");
    assert_eq!(echoed["headers"]["content-length"], "8");
    assert_eq!(echoed["body"], "raw body");
}
