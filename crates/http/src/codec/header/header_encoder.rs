//! Encoder for request heads.
//!
//! Writes the request line in origin form, fills in `host` from the target uri when the caller
//! did not set one, and keeps `content-length` consistent with the buffered body.

use crate::protocol::{PayloadSize, RequestHead, SendError, expects_body};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, Version, header};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 1024;

pub struct HeaderEncoder;

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        if head.version() != Version::HTTP_11 {
            error!(http_version = ?head.version(), "unsupported http version");
            return Err(io::Error::from(io::ErrorKind::Unsupported).into());
        }

        // userinfo never goes on the wire
        let host = match head.uri().authority() {
            Some(authority) => {
                let host = match authority.port_u16() {
                    Some(port) => format!("{}:{port}", authority.host()),
                    None => authority.host().to_string(),
                };
                HeaderValue::from_str(&host).map_err(SendError::invalid_target)?
            }
            None => return Err(SendError::invalid_target(format!("{} has no authority", head.uri()))),
        };
        head.headers_mut().entry(header::HOST).or_insert(host);

        let target = head.uri().path_and_query().map_or("/", |pq| pq.as_str());

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{} {} HTTP/1.1\r\n", head.method(), target)?;

        match payload_size {
            PayloadSize::Length(n) => {
                head.headers_mut().insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Empty => {
                if expects_body(head.method()) {
                    const ZERO_VALUE: HeaderValue = HeaderValue::from_static("0");
                    head.headers_mut().insert(header::CONTENT_LENGTH, ZERO_VALUE);
                } else {
                    head.headers_mut().remove(header::CONTENT_LENGTH);
                }
            }
            PayloadSize::Chunked | PayloadSize::Close => {
                return Err(SendError::invalid_body(format!("request body framing {payload_size:?} is not supported")));
            }
        }
        head.headers_mut().remove(header::TRANSFER_ENCODING);

        for (header_name, header_value) in head.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over a `BytesMut`, so the request line can go through `write!`.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
