//! Request body encoding and response body decoding.
//!
//! Requests are always fully buffered, so they are written with `content-length`.
//! Responses may arrive length framed, chunked, empty or delimited by connection close,
//! [`PayloadDecoder`] picks the matching strategy from a [`PayloadSize`](crate::protocol::PayloadSize).

mod chunked_decoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
