use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::{Request, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace};

use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHead, ResponseHead};

/// Drives a single request/response exchange over a split stream.
///
/// The connection is consumed by [`ClientConnection::send`], it is never reused for a
/// second request, so callers should ask the server to close it.
///
/// # Type Parameters
///
/// * `R`: The async readable half
/// * `W`: The async writable half
pub struct ClientConnection<R, W> {
    framed_read: FramedRead<R, ResponseDecoder>,
    framed_write: FramedWrite<W, RequestEncoder>,
}

impl<R, W> ClientConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, ResponseDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, RequestEncoder::new()),
        }
    }

    /// Writes `request` and reads back the complete response with its body buffered.
    pub async fn send(mut self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
        let (parts, body) = request.into_parts();
        let head = RequestHead::from_parts(parts, ());
        *self.framed_read.decoder_mut() = ResponseDecoder::for_method(head.method());

        debug!(method = %head.method(), uri = %head.uri(), body_size = body.len(), "sending request");
        let payload_size = PayloadSize::for_len(body.len());
        self.framed_write.feed(Message::<_, Bytes>::Header((head, payload_size))).await?;
        if !body.is_empty() {
            self.framed_write.feed(Message::<(RequestHead, PayloadSize), _>::Payload(PayloadItem::Chunk(body))).await?;
        }
        self.framed_write.send(Message::<(RequestHead, PayloadSize), Bytes>::Payload(PayloadItem::Eof)).await?;

        let head = self.read_head().await?;
        let body = self.read_body().await?;
        debug!(status = %head.status(), body_size = body.len(), "received response");

        let (parts, ()) = head.into_parts();
        Ok(Response::from_parts(parts, body))
    }

    async fn read_head(&mut self) -> Result<ResponseHead, HttpError> {
        match self.framed_read.next().await {
            Some(Ok(Message::Header((head, payload_size)))) => {
                trace!(?payload_size, "read response head");
                Ok(head)
            }
            Some(Ok(Message::Payload(_))) => Err(ParseError::invalid_body("receive payload before response head").into()),
            Some(Err(e)) => Err(e.into()),
            None => Err(ParseError::UnexpectedEof.into()),
        }
    }

    async fn read_body(&mut self) -> Result<Bytes, HttpError> {
        let mut body = BytesMut::new();
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => body.extend_from_slice(&bytes),
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(body.freeze()),
                Some(Ok(Message::Header(_))) => return Err(ParseError::invalid_body("receive response head while reading body").into()),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ParseError::UnexpectedEof.into()),
            }
        }
    }
}
