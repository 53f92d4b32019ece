use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Encodes a request body according to its framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    /// content-length payload
    Length(LengthEncoder),

    /// the request has no body
    NoBody,
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    /// Picks the encoder for a request body, streamed request bodies are not supported.
    pub fn for_size(size: PayloadSize) -> Result<Self, SendError> {
        match size {
            PayloadSize::Length(n) => Ok(Self::fix_length(n)),
            PayloadSize::Empty => Ok(Self::empty()),
            PayloadSize::Chunked | PayloadSize::Close => {
                Err(SendError::invalid_body(format!("request body framing {size:?} is not supported")))
            }
        }
    }

}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::NoBody => match item {
                PayloadItem::Chunk(bytes) if bytes.has_remaining() => {
                    Err(SendError::invalid_body("request declared no body but a chunk was written"))
                }
                _ => Ok(()),
            },
        }
    }
}
