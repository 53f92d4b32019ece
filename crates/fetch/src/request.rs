//! The request handed down the middleware chain, and the pieces of dispatch that build it.

use crate::error::RequestError;
use crate::options::ClientOptions;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A fully built request: method, absolute uri, headers and an optional buffered body.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TransferRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, headers: HeaderMap::new(), body: None }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn into_http(self) -> Request<Bytes> {
        let mut request = Request::new(self.body.unwrap_or_default());
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

impl From<Request<Bytes>> for TransferRequest {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self { method: parts.method, uri: parts.uri, headers: parts.headers, body: (!body.is_empty()).then_some(body) }
    }
}

/// Request data given to a dispatch call.
///
/// Raw data is sent as is. Structured data is encoded according to the request's
/// `content-type`, see [`encode_payload`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Raw(Bytes),
    Structured(Value),
}

impl Payload {
    /// Captures any serializable value as structured data.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self, RequestError> {
        serde_json::to_value(value).map(Payload::Structured).map_err(RequestError::encode)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes.into())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Raw(s.into())
    }
}

impl From<&'static str> for Payload {
    fn from(s: &'static str) -> Self {
        Payload::Raw(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Structured(value)
    }
}

/// Turns `"Name: value"` lines into a header map.
///
/// The line is split at the first colon, name and value are trimmed. Repeated names keep
/// every value in order.
pub fn parse_header_lines(lines: &[String]) -> Result<HeaderMap, RequestError> {
    let mut headers = HeaderMap::with_capacity(lines.len());
    for line in lines {
        let (name, value) = line.split_once(':').ok_or_else(|| RequestError::malformed_header(line))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| RequestError::malformed_header(line))?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| RequestError::malformed_header(line))?;
        headers.append(name, value);
    }
    Ok(headers)
}

/// Adds the `cookie` and `user-agent` options as headers when the request has none.
pub fn apply_defaults(headers: &mut HeaderMap, options: &ClientOptions) -> Result<(), RequestError> {
    if let Some(cookie) = options.cookie() {
        if !headers.contains_key(COOKIE) {
            let value = HeaderValue::from_str(cookie).map_err(|_| RequestError::malformed_header(format!("cookie: {cookie}")))?;
            headers.insert(COOKIE, value);
        }
    }

    if let Some(user_agent) = options.user_agent() {
        if !headers.contains_key(USER_AGENT) {
            let value =
                HeaderValue::from_str(user_agent).map_err(|_| RequestError::malformed_header(format!("user-agent: {user_agent}")))?;
            headers.insert(USER_AGENT, value);
        }
    }

    Ok(())
}

/// Produces the body bytes for `payload`.
///
/// Structured data is form encoded for `application/x-www-form-urlencoded` (nested keys in
/// brackets) and JSON encoded for `application/json`, parameters of the content type are
/// ignored. Without a content type the data is form encoded and the header is set.
///
/// # Errors
///
/// [`RequestError::UnsupportedContentType`] for structured data and any other content type,
/// [`RequestError::Encode`] when the data has no form representation.
pub fn encode_payload(payload: Option<Payload>, headers: &mut HeaderMap) -> Result<Option<Bytes>, RequestError> {
    let value = match payload {
        None => return Ok(None),
        Some(Payload::Raw(bytes)) => return Ok(Some(bytes)),
        Some(Payload::Structured(value)) => value,
    };

    let Some(raw) = headers.get(CONTENT_TYPE).map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()) else {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        return encode_form(&value).map(Some);
    };

    let mime = raw.parse::<mime::Mime>().map_err(|_| RequestError::unsupported_content_type(&raw))?;

    trace!(content_type = %mime, "encode structured payload");
    if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        encode_form(&value).map(Some)
    } else if mime.essence_str() == mime::APPLICATION_JSON.essence_str() {
        serde_json::to_vec(&value).map(|body| Some(Bytes::from(body))).map_err(RequestError::encode)
    } else {
        Err(RequestError::unsupported_content_type(raw))
    }
}

fn encode_form(value: &Value) -> Result<Bytes, RequestError> {
    serde_qs::to_string(value).map(Bytes::from).map_err(RequestError::encode)
}
