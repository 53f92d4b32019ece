//! Client side HTTP/1.1 codecs for [`tokio_util::codec`].
//!
//! - [`RequestEncoder`] serializes a request head and its buffered body
//! - [`ResponseDecoder`] parses a response head and then streams its body
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_fetch_http::codec::ResponseDecoder;
//! use micro_fetch_http::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut buffer = BytesMut::from("HTTP/1.1 204 No Content\r\n\r\n");
//! let mut decoder = ResponseDecoder::new();
//! let message = decoder.decode(&mut buffer).unwrap();
//! assert!(matches!(message, Some(Message::Header(_))));
//! ```

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
