//! Request head encoding and response head decoding.
//!
//! - [`HeaderEncoder`] writes the request line and header fields
//! - [`HeaderDecoder`] parses the status line and header fields and picks the body framing

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
