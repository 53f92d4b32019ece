use crate::encoding::Writer;
use crate::error::TransferError;
use bytes::Bytes;
use flate2::write::{GzDecoder, ZlibDecoder};
use http::Response;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use std::io;
use std::io::Write;
use tracing::{trace, warn};
use zstd::stream::write::Decoder as ZstdDecoder;

/// Represents the supported content codings.
pub(crate) enum Decoder {
    Gzip(Box<GzDecoder<Writer>>),
    Deflate(Box<ZlibDecoder<Writer>>),
    Zstd(Box<ZstdDecoder<'static, Writer>>),
    Br(Box<brotli::DecompressorWriter<Writer>>),
}

impl Decoder {
    /// Selects a decoder for one `content-encoding` token, `None` when it is not supported.
    fn from_content_encoding(coding: &str) -> Result<Option<Self>, TransferError> {
        let decoder = if coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip") {
            Self::Gzip(Box::new(GzDecoder::new(Writer::new())))
        } else if coding.eq_ignore_ascii_case("deflate") {
            Self::Deflate(Box::new(ZlibDecoder::new(Writer::new())))
        } else if coding.eq_ignore_ascii_case("zstd") {
            let decoder = ZstdDecoder::new(Writer::new()).map_err(|e| TransferError::decode("zstd", e))?;
            Self::Zstd(Box::new(decoder))
        } else if coding.eq_ignore_ascii_case("br") {
            Self::Br(Box::new(brotli::DecompressorWriter::new(Writer::new(), 32 * 1024)))
        } else {
            return Ok(None);
        };
        Ok(Some(decoder))
    }

    fn name(&self) -> &'static str {
        match self {
            Decoder::Gzip(_) => "gzip",
            Decoder::Deflate(_) => "deflate",
            Decoder::Zstd(_) => "zstd",
            Decoder::Br(_) => "br",
        }
    }

    /// Decodes a complete body.
    fn decode(self, data: &[u8]) -> io::Result<Bytes> {
        match self {
            Self::Gzip(mut decoder) => {
                decoder.write_all(data)?;
                Ok(decoder.finish()?.into_bytes())
            }

            Self::Deflate(mut decoder) => {
                decoder.write_all(data)?;
                Ok(decoder.finish()?.into_bytes())
            }

            Self::Zstd(mut decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
                Ok(decoder.into_inner().into_bytes())
            }

            Self::Br(mut decoder) => {
                decoder.write_all(data)?;
                decoder.flush()?;
                match decoder.into_inner() {
                    Ok(writer) => Ok(writer.into_bytes()),
                    Err(_) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "brotli stream is incomplete")),
                }
            }
        }
    }
}

/// Undoes the `content-encoding` of `response`.
///
/// Codings are removed in reverse order of application, `identity` is skipped. A response
/// using a coding this client doesn't know is returned untouched. On success the
/// `content-encoding` and `content-length` headers are dropped, they no longer describe the body.
pub(crate) fn decode_response(response: Response<Bytes>) -> Result<Response<Bytes>, TransferError> {
    if response.body().is_empty() {
        return Ok(response);
    }

    let decoders = match response.headers().get(CONTENT_ENCODING).and_then(|value| value.to_str().ok()) {
        Some(content_encoding) => decoders_for(content_encoding)?,
        None => None,
    };
    let Some(decoders) = decoders.filter(|decoders| !decoders.is_empty()) else {
        return Ok(response);
    };

    let (mut parts, mut body) = response.into_parts();
    for decoder in decoders {
        let name = decoder.name();
        body = decoder.decode(&body).map_err(|e| {
            warn!(encoding = name, cause = %e, "can't decode response body");
            TransferError::decode(name, e)
        })?;
    }

    parts.headers.remove(CONTENT_ENCODING);
    parts.headers.remove(CONTENT_LENGTH);
    Ok(Response::from_parts(parts, body))
}

/// The decoders for a `content-encoding` value, in the order they have to run.
fn decoders_for(content_encoding: &str) -> Result<Option<Vec<Decoder>>, TransferError> {
    let mut decoders = Vec::new();
    for coding in content_encoding.rsplit(',').map(str::trim).filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("identity")) {
        match Decoder::from_content_encoding(coding)? {
            Some(decoder) => decoders.push(decoder),
            None => {
                trace!(coding, "unknown content coding, leave the body encoded");
                return Ok(None);
            }
        }
    }
    Ok(Some(decoders))
}
