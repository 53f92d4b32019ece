//! Request interception.
//!
//! A middleware sees every [`TransferRequest`] before it reaches the transport and decides
//! what to do with it: pass it on with [`Next::run`], change it first, answer it on its own
//! with [`AsyncResponse::ready`], or call `next` more than once.
//!
//! Links are kept in install order. The most recently installed link runs first and each
//! [`Next`] points at the link installed before it, the last one points at the transfer engine.

use crate::error::ClientError;
use crate::options::ClientOptions;
use crate::request::TransferRequest;
use crate::response::AsyncResponse;
use crate::scheduler::Scheduler;
use crate::transfer::{self, Transport};
use std::fmt;
use std::sync::Arc;

pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, request: TransferRequest, next: Next) -> Result<AsyncResponse, ClientError>;
}

impl<F> Middleware for F
where
    F: Fn(TransferRequest, Next) -> Result<AsyncResponse, ClientError> + Send + Sync + 'static,
{
    fn handle(&self, request: TransferRequest, next: Next) -> Result<AsyncResponse, ClientError> {
        self(request, next)
    }
}

/// The installed links of a client.
///
/// Cloned clients share the links until one of them installs another link.
#[derive(Clone)]
pub(crate) struct MiddlewareChain {
    links: Arc<[Arc<dyn Middleware>]>,
}

impl MiddlewareChain {
    pub(crate) fn new(links: Vec<Arc<dyn Middleware>>) -> Self {
        Self { links: links.into() }
    }

    pub(crate) fn install(&mut self, middleware: Arc<dyn Middleware>) {
        let mut links = self.links.to_vec();
        links.push(middleware);
        self.links = links.into();
    }

    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }

    /// The entry point of one dispatch, carrying its resolved options down to the transport.
    pub(crate) fn entry(&self, scheduler: Scheduler, transport: Arc<dyn Transport>, options: Arc<ClientOptions>) -> Next {
        Next { links: Arc::clone(&self.links), index: self.links.len(), scheduler, transport, options }
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain").field("links", &self.links.len()).finish()
    }
}

/// The rest of the chain below one link.
#[derive(Clone)]
pub struct Next {
    links: Arc<[Arc<dyn Middleware>]>,
    // links[..index] are still to run
    index: usize,
    scheduler: Scheduler,
    transport: Arc<dyn Transport>,
    options: Arc<ClientOptions>,
}

impl Next {
    /// Passes `request` to the next link, or starts the transfer when no link is left.
    pub fn run(&self, request: TransferRequest) -> Result<AsyncResponse, ClientError> {
        match self.index.checked_sub(1) {
            Some(below) => {
                let link = Arc::clone(&self.links[below]);
                link.handle(request, Next { index: below, ..self.clone() })
            }
            None => Ok(transfer::begin(&self.scheduler, Arc::clone(&self.transport), request, Arc::clone(&self.options))),
        }
    }

    /// The options resolved for this dispatch.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// How many links run before the transfer engine.
    pub fn remaining(&self) -> usize {
        self.index
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("remaining", &self.index).field("options", &self.options).finish_non_exhaustive()
    }
}
