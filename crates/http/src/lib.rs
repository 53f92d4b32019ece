//! The HTTP/1.1 wire layer of `micro-fetch`.
//!
//! This crate knows how to put one request on a socket and read one response back. It has
//! no notion of options, timeouts or scheduling, those live in the `micro-fetch` crate.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::Request;
//! use micro_fetch_http::connection::ClientConnection;
//! use tokio::net::TcpStream;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:8080").await?;
//! let (reader, writer) = stream.into_split();
//!
//! let request = Request::get("http://127.0.0.1:8080/")
//!     .header(http::header::CONNECTION, "close")
//!     .body(Bytes::new())?;
//!
//! let response = ClientConnection::new(reader, writer).send(request).await?;
//! println!("{} with {} bytes", response.status(), response.body().len());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: message, payload and error types shared by the codecs
//! - [`codec`]: the request encoder and the response decoder
//! - [`connection`]: drives one exchange over a split stream
//!
//! # Limitations
//!
//! - HTTP/1.1 requests only, HTTP/1.0 and HTTP/1.1 responses
//! - No TLS
//! - Request bodies are fully buffered and sent with `content-length`
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
