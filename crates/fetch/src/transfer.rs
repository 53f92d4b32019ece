//! The transfer engine.
//!
//! [`begin`] registers a transfer on the scheduler and returns its pending response at once.
//! The network work itself is done by a [`Transport`], [`HttpTransport`] unless a client is
//! built with another one.

use crate::encoding::decode_response;
use crate::error::TransferError;
use crate::options::ClientOptions;
use crate::request::TransferRequest;
use crate::response::AsyncResponse;
use crate::scheduler::Scheduler;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT_ENCODING, CONNECTION};
use http::{HeaderValue, Response};
use micro_fetch_http::connection::ClientConnection;
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

const ACCEPTED_ENCODINGS: HeaderValue = HeaderValue::from_static("gzip, deflate, br, zstd");

/// Performs one request/response exchange.
///
/// A transport may honour the transfer related options, the overall `timeoutMs` limit is
/// applied around it by the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: TransferRequest, options: &ClientOptions) -> Result<Response<Bytes>, TransferError>;
}

/// HTTP/1.1 over plain TCP, one connection per transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransferRequest, options: &ClientOptions) -> Result<Response<Bytes>, TransferError> {
        let uri = request.uri();
        match uri.scheme_str() {
            Some("http") => {}
            other => return Err(TransferError::unsupported_scheme(other.unwrap_or_default())),
        }

        let authority = uri.authority().ok_or_else(|| TransferError::aborted(format!("{uri} has no authority")))?.clone();
        let port = authority.port_u16().unwrap_or(80);
        let host = authority.host().trim_start_matches('[').trim_end_matches(']');

        let connect = TcpStream::connect((host, port));
        let stream = match options.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, connect).await.unwrap_or_else(|_| {
                Err(io::Error::new(io::ErrorKind::TimedOut, format!("connect timed out after {}ms", limit.as_millis())))
            }),
            None => connect.await,
        }
        .map_err(|e| TransferError::connect(&authority, e))?;
        stream.set_nodelay(true)?;
        trace!(%authority, "connected");

        let mut request = request.into_http();
        let headers = request.headers_mut();
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
        if options.decode_content() && !headers.contains_key(ACCEPT_ENCODING) {
            headers.insert(ACCEPT_ENCODING, ACCEPTED_ENCODINGS);
        }

        let (reader, writer) = stream.into_split();
        let response = ClientConnection::new(reader, writer).send(request).await?;

        if options.decode_content() { decode_response(response) } else { Ok(response) }
    }
}

/// Registers a transfer of `request` on `scheduler` and returns its pending response.
///
/// The `timeoutMs` limit counts from this call. When it expires the transfer is dropped,
/// which closes its connection, and the response fails with [`TransferError::Timeout`].
pub fn begin(scheduler: &Scheduler, transport: Arc<dyn Transport>, request: TransferRequest, options: Arc<ClientOptions>) -> AsyncResponse {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let deadline = options.timeout().map(|limit| Instant::now() + limit);
    debug!(%method, %uri, timeout_ms = options.timeout_ms(), "begin transfer");

    let handle = scheduler.spawn(async move {
        let transfer = transport.send(request, &options);
        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, transfer).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let timeout_ms = options.timeout_ms().unwrap_or_default();
                    warn!(%method, %uri, timeout_ms, "transfer timed out");
                    Err(TransferError::timeout(timeout_ms))
                }
            },
            None => transfer.await,
        };

        match &outcome {
            Ok(response) => debug!(%method, %uri, status = %response.status(), "transfer finished"),
            Err(e) => debug!(%method, %uri, cause = %e, "transfer failed"),
        }
        outcome
    });

    AsyncResponse::pending(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode, Uri};
    use std::time::Duration;

    fn request(uri: &'static str) -> TransferRequest {
        TransferRequest::new(Method::GET, Uri::from_static(uri))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn begin_returns_before_the_transfer_finishes() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_, _| {
            std::thread::sleep(Duration::from_millis(50));
            Ok(Response::new(Bytes::from_static(b"done")))
        });

        let scheduler = Scheduler::current().unwrap();
        let started = Instant::now();
        let mut resp = begin(&scheduler, Arc::new(transport), request("http://localhost/"), Arc::new(ClientOptions::new()));
        assert!(started.elapsed() < Duration::from_millis(50));

        assert_eq!(resp.body().await.unwrap(), Bytes::from_static(b"done"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn options_reach_the_transport() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|request, options| request.uri() == "http://localhost/x" && options.cookie() == Some("k=v"))
            .returning(|_, _| Ok(Response::builder().status(StatusCode::NOT_FOUND).body(Bytes::new()).unwrap()));

        let scheduler = Scheduler::current().unwrap();
        let options = Arc::new(ClientOptions::new().with_cookie("k=v"));
        let mut resp = begin(&scheduler, Arc::new(transport), request("http://localhost/x"), options);

        assert_eq!(resp.status().await.unwrap(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn unsupported_scheme() {
        let result = HttpTransport.send(request("https://localhost/"), &ClientOptions::new()).await;
        assert!(matches!(result, Err(TransferError::UnsupportedScheme { scheme }) if scheme == "https"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn refused_connection() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uri: Uri = format!("http://{addr}/").parse().unwrap();
        let result = HttpTransport.send(TransferRequest::new(Method::GET, uri), &ClientOptions::new()).await;
        assert!(matches!(result, Err(TransferError::Connect { .. })));
    }
}
