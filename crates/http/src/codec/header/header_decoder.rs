//! Decoder for response heads.
//!
//! The status line and header fields are parsed with `httparse`. Header names and values are
//! recorded as byte ranges first and then sliced out of one frozen buffer, so values share
//! the buffer instead of being copied one by one.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only
//!
//! Interim `1xx` responses are consumed and skipped, the decoder only yields the final head.

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode, Version, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, ResponseHead, is_bodiless};

/// Maximum number of headers allowed in a response
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Parses a [`ResponseHead`] and works out how its payload is framed.
///
/// The framing depends on the request that was sent: a response to `HEAD` never has a body,
/// so the decoder has to be told with [`HeaderDecoder::for_head_request`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder {
    head_request: bool,
}

impl HeaderDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_head_request(head_request: bool) -> Self {
        Self { head_request }
    }

    fn decode_once(&self, src: &mut BytesMut) -> Result<Option<(ResponseHead, PayloadSize)>, ParseError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut response = httparse::Response::new(&mut headers);

        let parsed = response.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::Status => ParseError::invalid_status(e),
            Error::Version => ParseError::InvalidVersion(None),
            e => ParseError::invalid_header(e),
        })?;

        let body_offset = match parsed {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed response head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match response.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let code = response.code.ok_or_else(|| ParseError::invalid_status("missing status code"))?;
        let status = StatusCode::from_u16(code).map_err(ParseError::invalid_status)?;

        let header_count = response.headers.len();
        let mut header_index = EMPTY_HEADER_INDEX_ARRAY;
        HeaderIndex::record(src, response.headers, &mut header_index);

        let header_bytes = src.split_to(body_offset).freeze();
        let mut header_map = HeaderMap::with_capacity(header_count);
        for index in &header_index[..header_count] {
            let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                .map_err(ParseError::invalid_header)?;
            header_map.append(name, value);
        }

        let mut head = Response::new(());
        *head.status_mut() = status;
        *head.version_mut() = version;
        *head.headers_mut() = header_map;

        let payload_size = parse_payload(&head, self.head_request)?;
        Ok(Some((head, payload_size)))
    }
}

impl Decoder for HeaderDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.decode_once(src)? {
                Some((head, _)) if head.status().is_informational() => {
                    trace!(status = %head.status(), "skip interim response");
                }
                other => return Ok(other),
            }
        }
    }
}

/// Byte range positions of a header's name and value within the parsed buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

const EMPTY_HEADER_INDEX_ARRAY: [HeaderIndex; MAX_HEADER_NUM] = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, index) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            index.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            index.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Works out the response body framing, see
/// [RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3).
///
/// `transfer-encoding` wins over `content-length`. A transfer coding that does not end with
/// `chunked`, or a response with neither header, is delimited by the server closing the connection.
fn parse_payload(head: &ResponseHead, head_request: bool) -> Result<PayloadSize, ParseError> {
    if head_request || is_bodiless(head.status()) {
        return Ok(PayloadSize::Empty);
    }

    let te_header = head.headers().get(header::TRANSFER_ENCODING);
    let cl_header = head.headers().get(header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (Some(te_value), _) => {
            if is_chunked(Some(te_value)) {
                Ok(PayloadSize::Chunked)
            } else {
                Ok(PayloadSize::Close)
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value is not visible ascii"))?;
            let length =
                cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;
            Ok(if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) })
        }

        (None, None) => Ok(PayloadSize::Close),
    }
}

/// Returns true if `chunked` is the final coding of a `transfer-encoding` value.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    header_value
        .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn decode(raw: &str) -> (ResponseHead, PayloadSize, BytesMut) {
        let mut buf = BytesMut::from(raw);
        let (head, payload_size) = HeaderDecoder::new().decode(&mut buf).unwrap().unwrap();
        (head, payload_size, buf)
    }

    #[test]
    fn check_is_chunked() {
        assert!(!is_chunked(None));
        assert!(is_chunked(Some(&HeaderValue::from_static("gzip, chunked"))));
        assert!(is_chunked(Some(&HeaderValue::from_static("Chunked"))));
        assert!(!is_chunked(Some(&HeaderValue::from_static("chunked, gzip"))));
        assert!(!is_chunked(Some(&HeaderValue::from_static("gzip"))));
    }

    #[test]
    fn content_length_response() {
        let (head, payload_size, rest) = decode(indoc! {r##"
        HTTP/1.1 200 OK
        Content-Type: text/plain
        Content-Length: 5
        Set-Cookie: a=1
        Set-Cookie: b=2

        hello"##});

        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(head.headers().get_all(header::SET_COOKIE).iter().count(), 2);
        assert_eq!(payload_size, PayloadSize::Length(5));
        assert_eq!(&rest[..], b"hello");
    }

    #[test]
    fn transfer_encoding_wins_over_content_length() {
        let (_, payload_size, _) = decode(indoc! {r##"
        HTTP/1.1 200 OK
        Transfer-Encoding: chunked
        Content-Length: 100

        "##});
        assert_eq!(payload_size, PayloadSize::Chunked);
    }

    #[test]
    fn no_framing_headers_reads_until_close() {
        let (head, payload_size, _) = decode(indoc! {r##"
        HTTP/1.0 200 OK
        Server: test

        "##});
        assert_eq!(head.version(), Version::HTTP_10);
        assert_eq!(payload_size, PayloadSize::Close);
    }

    #[test]
    fn bodiless_statuses_and_head_requests() {
        let (_, payload_size, _) = decode("HTTP/1.1 204 No Content\r\nContent-Length: 10\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::Empty);

        let (_, payload_size, _) = decode("HTTP/1.1 304 Not Modified\r\n\r\n");
        assert_eq!(payload_size, PayloadSize::Empty);

        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n");
        let (_, payload_size) = HeaderDecoder::for_head_request(true).decode(&mut buf).unwrap().unwrap();
        assert_eq!(payload_size, PayloadSize::Empty);
    }

    #[test]
    fn skips_interim_responses() {
        let (head, payload_size, rest) =
            decode("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 404 Not Found\r\nContent-Length: 3\r\n\r\nnop");
        assert_eq!(head.status(), StatusCode::NOT_FOUND);
        assert_eq!(payload_size, PayloadSize::Length(3));
        assert_eq!(&rest[..], b"nop");
    }

    #[test]
    fn partial_head_needs_more_data() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Len");
        assert!(HeaderDecoder::new().decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 28);
    }

    #[test]
    fn rejects_bad_heads() {
        let mut buf = BytesMut::from("HTTP/1.1 abc OK\r\n\r\n");
        assert!(HeaderDecoder::new().decode(&mut buf).is_err());

        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n");
        assert!(matches!(HeaderDecoder::new().decode(&mut buf), Err(ParseError::InvalidContentLength { .. })));

        let mut buf = BytesMut::from(format!("HTTP/1.1 200 OK\r\nX-Big: {}", "a".repeat(MAX_HEADER_BYTES)).as_str());
        assert!(matches!(HeaderDecoder::new().decode(&mut buf), Err(ParseError::TooLargeHeader { .. })));
    }
}
