//! Streaming decoder for incoming responses.
//!
//! Yields one [`Message::Header`] and then the payload items of that response.
//! While `payload_decoder` is `None` the decoder is reading a head.

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead};
use bytes::BytesMut;
use http::Method;
use tokio_util::codec::Decoder;

pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// A decoder for the response to a request sent with `method`.
    pub fn for_method(method: &Method) -> Self {
        Self { header_decoder: HeaderDecoder::for_head_request(*method == Method::HEAD), payload_decoder: None }
    }

    fn take_payload(&mut self, item: Option<PayloadItem>) -> Option<Message<(ResponseHead, PayloadSize)>> {
        match item {
            Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
            Some(item @ PayloadItem::Eof) => {
                self.payload_decoder.take();
                Some(Message::Payload(item))
            }
            None => None,
        }
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder::new(), payload_decoder: None }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            return Ok(self.take_payload(item));
        }

        let message = match self.header_decoder.decode(src)? {
            Some((head, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((head, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode_eof(src)?;
            return Ok(self.take_payload(item));
        }

        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::UnexpectedEof),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn decodes_head_and_body() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
        let mut decoder = ResponseDecoder::new();

        let Some(Message::Header((head, payload_size))) = decoder.decode(&mut buf).unwrap() else { panic!("expect head") };
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(payload_size, PayloadSize::Length(2));

        let Some(Message::Payload(item)) = decoder.decode(&mut buf).unwrap() else { panic!("expect chunk") };
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"ok");

        let Some(Message::Payload(item)) = decoder.decode(&mut buf).unwrap() else { panic!("expect eof") };
        assert!(item.is_eof());
    }

    #[test]
    fn head_response_has_no_body() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 20\r\n\r\n");
        let mut decoder = ResponseDecoder::for_method(&Method::HEAD);

        let Some(Message::Header((_, payload_size))) = decoder.decode(&mut buf).unwrap() else { panic!("expect head") };
        assert!(payload_size.is_empty());
        let Some(Message::Payload(item)) = decoder.decode(&mut buf).unwrap() else { panic!("expect eof") };
        assert!(item.is_eof());
    }

    #[test]
    fn close_delimited_body_ends_at_eof() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\n\r\nstream");
        let mut decoder = ResponseDecoder::new();

        decoder.decode(&mut buf).unwrap().unwrap();
        let Some(Message::Payload(item)) = decoder.decode(&mut buf).unwrap() else { panic!("expect chunk") };
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"stream");
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        let Some(Message::Payload(item)) = decoder.decode_eof(&mut buf).unwrap() else { panic!("expect eof") };
        assert!(item.is_eof());
    }

    #[test]
    fn truncated_head_is_unexpected_eof() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nContent-");
        assert!(matches!(ResponseDecoder::new().decode_eof(&mut buf), Err(ParseError::UnexpectedEof)));
    }
}
