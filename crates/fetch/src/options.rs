//! Client options and how they are layered.
//!
//! Options are plain values. A client keeps its construction time defaults, every call may
//! pass overrides, and [`ClientOptions::resolve`] layers the two into a new value without
//! touching either input.
//!
//! Options can be written in code with the `with_*` builders or read from a JSON mapping whose
//! keys are the option names: `headers`, `cookie`, `userAgent`, `timeoutMs`,
//! `connectTimeoutMs` and `decodeContent`.
//!
//! ```
//! use micro_fetch::ClientOptions;
//! use serde_json::json;
//!
//! let defaults = ClientOptions::new().with_user_agent("micro-fetch").with_timeout_ms(5_000);
//! let overrides = ClientOptions::try_from(json!({ "timeoutMs": 100 })).unwrap();
//!
//! let resolved = defaults.resolve(Some(&overrides));
//! assert_eq!(resolved.timeout_ms(), Some(100));
//! assert_eq!(resolved.user_agent(), Some("micro-fetch"));
//! ```

use crate::error::OptionError;
use serde_json::{Map, Value};
use std::time::Duration;

/// The option names accepted by [`ClientOptions::set`] and [`ClientOptions::from_map`].
pub const OPTION_NAMES: [&str; 6] = ["headers", "cookie", "userAgent", "timeoutMs", "connectTimeoutMs", "decodeContent"];

/// Per client or per call transfer settings, `None` fields inherit from the layer below.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    headers: Option<Vec<String>>,
    cookie: Option<String>,
    user_agent: Option<String>,
    timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    decode_content: Option<bool>,
    locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Headers,
    Cookie,
    UserAgent,
    TimeoutMs,
    ConnectTimeoutMs,
    DecodeContent,
}

impl Field {
    fn parse(name: &str) -> Result<Self, OptionError> {
        match name {
            "headers" => Ok(Field::Headers),
            "cookie" => Ok(Field::Cookie),
            "userAgent" => Ok(Field::UserAgent),
            "timeoutMs" => Ok(Field::TimeoutMs),
            "connectTimeoutMs" => Ok(Field::ConnectTimeoutMs),
            "decodeContent" => Ok(Field::DecodeContent),
            _ => Err(OptionError::unknown_option(name)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Headers => "headers",
            Field::Cookie => "cookie",
            Field::UserAgent => "userAgent",
            Field::TimeoutMs => "timeoutMs",
            Field::ConnectTimeoutMs => "connectTimeoutMs",
            Field::DecodeContent => "decodeContent",
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from a JSON mapping. A `null` value leaves the option unset.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, OptionError> {
        let mut options = Self::new();
        for (name, value) in map {
            options.set(&name, value)?;
        }
        Ok(options)
    }

    /// Sets one option by name, `null` unsets it.
    ///
    /// # Errors
    ///
    /// - [`OptionError::UnknownOption`] when `name` is not one of [`OPTION_NAMES`]
    /// - [`OptionError::IllegalOperation`] when these options are locked
    /// - [`OptionError::InvalidValue`] when `value` has the wrong type
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), OptionError> {
        let field = Field::parse(name)?;
        if self.locked {
            return Err(OptionError::illegal_operation(name));
        }

        match field {
            Field::Headers => self.headers = parse_headers(field, value)?,
            Field::Cookie => self.cookie = parse_string(field, value)?,
            Field::UserAgent => self.user_agent = parse_string(field, value)?,
            Field::TimeoutMs => self.timeout_ms = parse_millis(field, value)?,
            Field::ConnectTimeoutMs => self.connect_timeout_ms = parse_millis(field, value)?,
            Field::DecodeContent => {
                self.decode_content = match value {
                    Value::Null => None,
                    Value::Bool(b) => Some(b),
                    _ => return Err(OptionError::invalid_value(field.name(), "a boolean")),
                }
            }
        }
        Ok(())
    }

    /// Layers `overrides` over `self`: a field set in `overrides` wins, an unset one inherits.
    ///
    /// `headers` are replaced as a whole, never merged. The result is unlocked.
    #[must_use]
    pub fn resolve(&self, overrides: Option<&ClientOptions>) -> ClientOptions {
        let Some(overrides) = overrides else {
            return Self { locked: false, ..self.clone() };
        };

        Self {
            headers: overrides.headers.clone().or_else(|| self.headers.clone()),
            cookie: overrides.cookie.clone().or_else(|| self.cookie.clone()),
            user_agent: overrides.user_agent.clone().or_else(|| self.user_agent.clone()),
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            connect_timeout_ms: overrides.connect_timeout_ms.or(self.connect_timeout_ms),
            decode_content: overrides.decode_content.or(self.decode_content),
            locked: false,
        }
    }

    /// Freezes these options, later calls to [`ClientOptions::set`] fail.
    #[must_use]
    pub fn lock(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Appends one `"Name: value"` header line.
    #[must_use]
    pub fn with_header(mut self, line: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Vec::new).push(line.into());
        self
    }

    /// Replaces the header lines.
    #[must_use]
    pub fn with_headers<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn with_connect_timeout_ms(mut self, connect_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = Some(connect_timeout_ms);
        self
    }

    #[must_use]
    pub fn with_decode_content(mut self, decode_content: bool) -> Self {
        self.decode_content = Some(decode_content);
        self
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    pub fn connect_timeout_ms(&self) -> Option<u64> {
        self.connect_timeout_ms
    }

    /// The transfer time limit, `0` means no limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    /// The connect time limit, `0` means no limit.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    /// Whether compressed responses are decoded, on unless turned off.
    pub fn decode_content(&self) -> bool {
        self.decode_content.unwrap_or(true)
    }
}

// the lock is a property of who holds the value, not part of it
impl PartialEq for ClientOptions {
    fn eq(&self, other: &Self) -> bool {
        self.headers == other.headers
            && self.cookie == other.cookie
            && self.user_agent == other.user_agent
            && self.timeout_ms == other.timeout_ms
            && self.connect_timeout_ms == other.connect_timeout_ms
            && self.decode_content == other.decode_content
    }
}

impl Eq for ClientOptions {}

impl TryFrom<Value> for ClientOptions {
    type Error = OptionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(OptionError::NotAMapping),
        }
    }
}

impl TryFrom<Map<String, Value>> for ClientOptions {
    type Error = OptionError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_map(map)
    }
}

fn parse_headers(field: Field, value: Value) -> Result<Option<Vec<String>>, OptionError> {
    const EXPECTED: &str = "an array of header lines";
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(line) => Ok(line),
                _ => Err(OptionError::invalid_value(field.name(), EXPECTED)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Err(OptionError::invalid_value(field.name(), EXPECTED)),
    }
}

fn parse_string(field: Field, value: Value) -> Result<Option<String>, OptionError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(OptionError::invalid_value(field.name(), "a string")),
    }
}

fn parse_millis(field: Field, value: Value) -> Result<Option<u64>, OptionError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_u64().map(Some).ok_or_else(|| OptionError::invalid_value(field.name(), "a non-negative integer")),
        _ => Err(OptionError::invalid_value(field.name(), "a non-negative integer")),
    }
}

/// Per call overrides in any of the shapes a caller may have them in.
///
/// Implemented for `()` (no overrides), [`ClientOptions`], `&ClientOptions`,
/// `Option<ClientOptions>`, a JSON [`Value`] (`null` or an object) and a JSON [`Map`].
pub trait IntoOptions {
    fn into_options(self) -> Result<Option<ClientOptions>, OptionError>;
}

impl IntoOptions for () {
    fn into_options(self) -> Result<Option<ClientOptions>, OptionError> {
        Ok(None)
    }
}

impl IntoOptions for ClientOptions {
    fn into_options(self) -> Result<Option<ClientOptions>, OptionError> {
        Ok(Some(self))
    }
}

impl IntoOptions for &ClientOptions {
    fn into_options(self) -> Result<Option<ClientOptions>, OptionError> {
        Ok(Some(self.clone()))
    }
}

impl IntoOptions for Option<ClientOptions> {
    fn into_options(self) -> Result<Option<ClientOptions>, OptionError> {
        Ok(self)
    }
}

impl IntoOptions for Value {
    fn into_options(self) -> Result<Option<ClientOptions>, OptionError> {
        match self {
            Value::Null => Ok(None),
            value => ClientOptions::try_from(value).map(Some),
        }
    }
}

impl IntoOptions for Map<String, Value> {
    fn into_options(self) -> Result<Option<ClientOptions>, OptionError> {
        ClientOptions::from_map(self).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_map_reads_every_option() {
        let options = ClientOptions::try_from(json!({
            "headers": ["Accept: text/plain", "X-Trace: 1"],
            "cookie": "session=abc",
            "userAgent": "test-agent",
            "timeoutMs": 250,
            "connectTimeoutMs": 50,
            "decodeContent": false,
        }))
        .unwrap();

        assert_eq!(options.headers(), Some(&["Accept: text/plain".to_string(), "X-Trace: 1".to_string()][..]));
        assert_eq!(options.cookie(), Some("session=abc"));
        assert_eq!(options.user_agent(), Some("test-agent"));
        assert_eq!(options.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(options.connect_timeout(), Some(Duration::from_millis(50)));
        assert!(!options.decode_content());

        assert_eq!(ClientOptions::new().with_timeout_ms(0).timeout(), None);
    }

    #[test]
    fn from_map_rejects_bad_input() {
        assert_eq!(ClientOptions::try_from(json!({ "proxy": "x" })), Err(OptionError::unknown_option("proxy")));
        assert_eq!(
            ClientOptions::try_from(json!({ "timeoutMs": "fast" })),
            Err(OptionError::invalid_value("timeoutMs", "a non-negative integer"))
        );
        assert!(matches!(ClientOptions::try_from(json!({ "headers": [1] })), Err(OptionError::InvalidValue { .. })));
        assert_eq!(ClientOptions::try_from(json!(["headers"])), Err(OptionError::NotAMapping));
    }

    #[test]
    fn null_means_inherit() {
        let defaults = ClientOptions::new().with_cookie("a=1");
        let overrides = ClientOptions::try_from(json!({ "cookie": null })).unwrap();
        assert_eq!(defaults.resolve(Some(&overrides)).cookie(), Some("a=1"));
    }

    #[test]
    fn resolve_layers_per_field() {
        let defaults = ClientOptions::new()
            .with_header("Accept: text/html")
            .with_header("X-Default: 1")
            .with_user_agent("default-agent")
            .with_timeout_ms(1_000);
        let overrides = ClientOptions::new().with_header("Accept: application/json").with_timeout_ms(10);

        let resolved = defaults.resolve(Some(&overrides));
        assert_eq!(resolved.headers(), Some(&["Accept: application/json".to_string()][..]));
        assert_eq!(resolved.user_agent(), Some("default-agent"));
        assert_eq!(resolved.timeout_ms(), Some(10));
        assert!(resolved.decode_content());

        // inputs are untouched
        assert_eq!(defaults.timeout_ms(), Some(1_000));
        assert_eq!(overrides.user_agent(), None);

        assert_eq!(defaults.resolve(None), defaults);
    }

    #[test]
    fn locked_options_reject_set() {
        let mut options = ClientOptions::new().with_timeout_ms(5).lock();
        assert_eq!(options.set("timeoutMs", json!(10)), Err(OptionError::illegal_operation("timeoutMs")));
        assert_eq!(options.set("retries", json!(1)), Err(OptionError::unknown_option("retries")));
        assert_eq!(options.timeout_ms(), Some(5));

        let resolved = options.resolve(None);
        assert!(!resolved.is_locked());
        assert_eq!(resolved, options);
    }

    #[test]
    fn into_options_shapes() {
        assert_eq!(().into_options(), Ok(None));
        assert_eq!(Value::Null.into_options(), Ok(None));
        assert_eq!(json!("x").into_options(), Err(OptionError::NotAMapping));

        let options = ClientOptions::new().with_cookie("c=1");
        assert_eq!((&options).into_options(), Ok(Some(options.clone())));
        assert_eq!(Some(options.clone()).into_options(), Ok(Some(options.clone())));

        let mut map = Map::new();
        map.insert("cookie".to_string(), json!("c=1"));
        assert_eq!(map.into_options(), Ok(Some(options)));
    }
}
