//! Error types of the client.
//!
//! Errors are split by the phase they surface in:
//! - [`OptionError`] when options are built or layered
//! - [`RequestError`] when a call is dispatched
//! - [`TransferError`] when a response is first read
//!
//! [`ClientError`] wraps all of them for the operations that can fail in more than one phase.

use micro_fetch_http::protocol::HttpError;
use std::io;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("option error: {source}")]
    Option {
        #[from]
        source: OptionError,
    },

    #[error("request error: {source}")]
    Request {
        #[from]
        source: RequestError,
    },

    #[error("transfer error: {source}")]
    Transfer {
        #[from]
        source: TransferError,
    },

    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Returns the transfer error when this failure happened on the wire.
    pub fn as_transfer(&self) -> Option<&TransferError> {
        match self {
            ClientError::Transfer { source } => Some(source),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.as_transfer().is_some_and(TransferError::is_timeout)
    }
}

/// Errors raised while building, setting or layering options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown option '{name}'")]
    UnknownOption { name: String },

    #[error("option '{name}' can't be changed, the options are locked")]
    IllegalOperation { name: String },

    #[error("invalid value for option '{name}', expect {expected}")]
    InvalidValue { name: String, expected: &'static str },

    #[error("options must be given as a mapping")]
    NotAMapping,
}

impl OptionError {
    pub fn unknown_option<S: ToString>(name: S) -> Self {
        Self::UnknownOption { name: name.to_string() }
    }

    pub fn illegal_operation<S: ToString>(name: S) -> Self {
        Self::IllegalOperation { name: name.to_string() }
    }

    pub fn invalid_value<S: ToString>(name: S, expected: &'static str) -> Self {
        Self::InvalidValue { name: name.to_string(), expected }
    }
}

/// Errors raised while turning a call into a transfer request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed header line '{header}'")]
    MalformedHeader { header: String },

    #[error("can't encode a structured body as '{content_type}'")]
    UnsupportedContentType { content_type: String },

    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("can't encode body: {reason}")]
    Encode { reason: String },
}

impl RequestError {
    pub fn malformed_header<S: ToString>(header: S) -> Self {
        Self::MalformedHeader { header: header.to_string() }
    }

    pub fn unsupported_content_type<S: ToString>(content_type: S) -> Self {
        Self::UnsupportedContentType { content_type: content_type.to_string() }
    }

    pub fn invalid_uri<U: ToString, R: ToString>(uri: U, reason: R) -> Self {
        Self::InvalidUri { uri: uri.to_string(), reason: reason.to_string() }
    }

    pub fn encode<S: ToString>(reason: S) -> Self {
        Self::Encode { reason: reason.to_string() }
    }
}

/// Errors raised by a transfer, reported on first access of the response.
///
/// A failed response keeps its error and hands out clones on every later access,
/// so the causes are shared behind `Arc`.
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    #[error("transfer timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("can't connect to {authority}: {source}")]
    Connect { authority: String, source: Arc<io::Error> },

    #[error("io error: {source}")]
    Io { source: Arc<io::Error> },

    #[error("protocol error: {source}")]
    Protocol { source: Arc<HttpError> },

    #[error("unsupported scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("can't decode {encoding} content: {source}")]
    Decode { encoding: &'static str, source: Arc<io::Error> },

    #[error("transfer was cancelled")]
    Cancelled,

    #[error("transfer aborted: {reason}")]
    Aborted { reason: String },
}

impl TransferError {
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn connect<S: ToString>(authority: S, source: io::Error) -> Self {
        Self::Connect { authority: authority.to_string(), source: Arc::new(source) }
    }

    pub fn unsupported_scheme<S: ToString>(scheme: S) -> Self {
        Self::UnsupportedScheme { scheme: scheme.to_string() }
    }

    pub fn decode(encoding: &'static str, source: io::Error) -> Self {
        Self::Decode { encoding, source: Arc::new(source) }
    }

    pub fn aborted<S: ToString>(reason: S) -> Self {
        Self::Aborted { reason: reason.to_string() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout { .. })
    }
}

impl From<io::Error> for TransferError {
    fn from(e: io::Error) -> Self {
        Self::Io { source: Arc::new(e) }
    }
}

impl From<HttpError> for TransferError {
    fn from(e: HttpError) -> Self {
        Self::Protocol { source: Arc::new(e) }
    }
}
