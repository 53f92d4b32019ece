//! The client and its dispatch path.
//!
//! Every call resolves its options against the client defaults, builds a [`TransferRequest`]
//! from them and hands it to the middleware chain. The call returns as soon as the transfer is
//! registered, nothing waits for the network until the response is read.

use crate::error::{ClientError, OptionError, RequestError};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::options::{ClientOptions, IntoOptions};
use crate::request::{Payload, TransferRequest, apply_defaults, encode_payload, parse_header_lines};
use crate::response::AsyncResponse;
use crate::scheduler::Scheduler;
use crate::transfer::{HttpTransport, Transport};
use http::{HeaderMap, Method, Uri};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An HTTP client whose calls return [`AsyncResponse`]s before the transfer completes.
///
/// ```no_run
/// use micro_fetch::{Client, ClientOptions};
///
/// # async fn run() -> Result<(), micro_fetch::ClientError> {
/// let client = Client::with_options(ClientOptions::new().with_timeout_ms(2_000))?;
///
/// // both transfers are in flight before either is read
/// let mut first = client.get("http://127.0.0.1:8080/a")?;
/// let mut second = client.get("http://127.0.0.1:8080/b")?;
///
/// println!("{} {}", first.status().await?, second.text().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    defaults: Arc<ClientOptions>,
    chain: MiddlewareChain,
    scheduler: Scheduler,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// A client with no default options, on the global scheduler, speaking plain HTTP.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_options(options: impl IntoOptions) -> Result<Self, OptionError> {
        let options = options.into_options()?.unwrap_or_default();
        Ok(Self::builder().options(options).build())
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The construction time defaults, locked. Calls never change them.
    pub fn options(&self) -> &ClientOptions {
        &self.defaults
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Installs `middleware` as the new outermost link.
    pub fn add_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.chain.install(Arc::new(middleware));
        self
    }

    pub fn get(&self, url: impl AsRef<str>) -> Result<AsyncResponse, ClientError> {
        self.request(Method::GET, url, None, ())
    }

    pub fn get_with(&self, url: impl AsRef<str>, options: impl IntoOptions) -> Result<AsyncResponse, ClientError> {
        self.request(Method::GET, url, None, options)
    }

    pub fn post(&self, url: impl AsRef<str>, body: impl Into<Payload>) -> Result<AsyncResponse, ClientError> {
        self.request(Method::POST, url, Some(body.into()), ())
    }

    pub fn post_with(&self, url: impl AsRef<str>, body: impl Into<Payload>, options: impl IntoOptions) -> Result<AsyncResponse, ClientError> {
        self.request(Method::POST, url, Some(body.into()), options)
    }

    pub fn put(&self, url: impl AsRef<str>, body: impl Into<Payload>) -> Result<AsyncResponse, ClientError> {
        self.request(Method::PUT, url, Some(body.into()), ())
    }

    pub fn put_with(&self, url: impl AsRef<str>, body: impl Into<Payload>, options: impl IntoOptions) -> Result<AsyncResponse, ClientError> {
        self.request(Method::PUT, url, Some(body.into()), options)
    }

    pub fn delete(&self, url: impl AsRef<str>) -> Result<AsyncResponse, ClientError> {
        self.request(Method::DELETE, url, None, ())
    }

    pub fn delete_with(&self, url: impl AsRef<str>, options: impl IntoOptions) -> Result<AsyncResponse, ClientError> {
        self.request(Method::DELETE, url, None, options)
    }

    /// Dispatches one call.
    ///
    /// # Errors
    ///
    /// Fails without starting a transfer when the overrides are invalid, a header line is
    /// malformed, the body can't be encoded for its content type or `url` is not absolute.
    /// Middleware errors are passed through.
    pub fn request(
        &self,
        method: Method,
        url: impl AsRef<str>,
        body: Option<Payload>,
        options: impl IntoOptions,
    ) -> Result<AsyncResponse, ClientError> {
        let uri = parse_uri(url.as_ref())?;
        let overrides = options.into_options()?;
        let resolved = self.defaults.resolve(overrides.as_ref());

        let mut headers = match resolved.headers() {
            Some(lines) => parse_header_lines(lines)?,
            None => HeaderMap::new(),
        };
        apply_defaults(&mut headers, &resolved)?;
        let body = encode_payload(body, &mut headers)?;

        let mut request = TransferRequest::new(method, uri).with_headers(headers);
        if let Some(body) = body {
            request = request.with_body(body);
        }

        self.dispatch(request, resolved)
    }

    /// Dispatches a request built by the caller.
    ///
    /// The client defaults apply, `cookie` and `user-agent` are added when the request has
    /// none. The `headers` default is not merged in, the request brings its own.
    pub fn send_request(&self, request: impl Into<TransferRequest>) -> Result<AsyncResponse, ClientError> {
        let mut request = request.into();
        check_absolute(request.uri())?;

        let resolved = self.defaults.resolve(None);
        apply_defaults(request.headers_mut(), &resolved)?;
        self.dispatch(request, resolved)
    }

    fn dispatch(&self, request: TransferRequest, resolved: ClientOptions) -> Result<AsyncResponse, ClientError> {
        debug!(method = %request.method(), uri = %request.uri(), links = self.chain.len(), "dispatch request");
        let next = self.chain.entry(self.scheduler.clone(), Arc::clone(&self.transport), Arc::new(resolved));
        next.run(request)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.defaults)
            .field("chain", &self.chain)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

fn parse_uri(url: &str) -> Result<Uri, RequestError> {
    let uri = url.parse::<Uri>().map_err(|e| RequestError::invalid_uri(url, e))?;
    check_absolute(&uri)?;
    Ok(uri)
}

fn check_absolute(uri: &Uri) -> Result<(), RequestError> {
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(RequestError::invalid_uri(uri, "expect an absolute url with scheme and host"));
    }
    Ok(())
}

/// Builds a [`Client`] with an injected scheduler, transport or middleware.
pub struct ClientBuilder {
    options: ClientOptions,
    scheduler: Option<Scheduler>,
    transport: Option<Arc<dyn Transport>>,
    links: Vec<Arc<dyn Middleware>>,
}

impl ClientBuilder {
    fn new() -> Self {
        Self { options: ClientOptions::new(), scheduler: None, transport: None, links: vec![] }
    }

    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Installs `middleware`, later calls end up outermost.
    #[must_use]
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.links.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Client {
        Client {
            defaults: Arc::new(self.options.lock()),
            chain: MiddlewareChain::new(self.links),
            scheduler: self.scheduler.unwrap_or_default(),
            transport: self.transport.unwrap_or_else(|| Arc::new(HttpTransport)),
        }
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder").field("options", &self.options).field("links", &self.links.len()).finish_non_exhaustive()
    }
}
