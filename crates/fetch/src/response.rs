//! The lazy response handle.
//!
//! An [`AsyncResponse`] is handed out as soon as a transfer is registered. The first accessor
//! that needs the outcome waits for the transfer, later accessors read the settled outcome.
//! A failed transfer keeps failing with the same error.

use crate::error::{ClientError, TransferError};
use crate::scheduler::Scheduler;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::AsHeaderName;
use http::{HeaderMap, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::mem;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type TransferOutcome = Result<Response<Bytes>, TransferError>;

pub struct AsyncResponse {
    state: State,
}

enum State {
    Pending(JoinHandle<TransferOutcome>),
    Settled(TransferOutcome),
}

impl AsyncResponse {
    pub(crate) fn pending(handle: JoinHandle<TransferOutcome>) -> Self {
        Self { state: State::Pending(handle) }
    }

    /// A response that is already there, for middleware that answers without a transfer.
    pub fn ready(response: Response<Bytes>) -> Self {
        Self { state: State::Settled(Ok(response)) }
    }

    pub fn failed(error: TransferError) -> Self {
        Self { state: State::Settled(Err(error)) }
    }

    /// Runs `future` on `scheduler` and settles with its outcome.
    ///
    /// Middleware uses this to work on the response of `next` without waiting for it during
    /// dispatch:
    ///
    /// ```no_run
    /// use micro_fetch::{AsyncResponse, Client, ClientError, Next, TransferRequest};
    ///
    /// let mut client = Client::new();
    /// client.add_middleware(|request: TransferRequest, next: Next| -> Result<AsyncResponse, ClientError> {
    ///     let inner = next.run(request)?;
    ///     Ok(AsyncResponse::defer(next.scheduler(), async move {
    ///         let mut response = inner.await?;
    ///         response.headers_mut().insert("x-seen", "1".parse().unwrap());
    ///         Ok(response)
    ///     }))
    /// });
    /// ```
    pub fn defer<F>(scheduler: &Scheduler, future: F) -> Self
    where
        F: Future<Output = TransferOutcome> + Send + 'static,
    {
        Self::pending(scheduler.spawn(future))
    }

    /// Returns true until an accessor has observed the outcome.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending(_))
    }

    /// Returns true when the outcome is available without waiting.
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Pending(handle) => handle.is_finished(),
            State::Settled(_) => true,
        }
    }

    /// Waits for the transfer, once.
    ///
    /// Dropping this future before it completes leaves the response pending.
    pub async fn resolve(&mut self) -> Result<&Response<Bytes>, TransferError> {
        if let State::Pending(handle) = &mut self.state {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => Err(TransferError::Cancelled),
                Err(e) => {
                    warn!(cause = %e, "transfer task panicked");
                    Err(TransferError::aborted(e))
                }
            };
            debug!(ok = outcome.is_ok(), "response settled");
            self.state = State::Settled(outcome);
        }

        match &self.state {
            State::Settled(Ok(response)) => Ok(response),
            State::Settled(Err(e)) => Err(e.clone()),
            State::Pending(_) => unreachable!("a pending response is settled before it is read"),
        }
    }

    pub async fn status(&mut self) -> Result<StatusCode, TransferError> {
        self.resolve().await.map(Response::status)
    }

    pub async fn headers(&mut self) -> Result<&HeaderMap, TransferError> {
        self.resolve().await.map(Response::headers)
    }

    /// All values of header `name` joined with `", "`, empty when absent.
    pub async fn header_line<K: AsHeaderName>(&mut self, name: K) -> Result<String, TransferError> {
        let headers = self.headers().await?;
        let values: Vec<_> = headers.get_all(name).iter().map(|value| String::from_utf8_lossy(value.as_bytes())).collect();
        Ok(values.join(", "))
    }

    pub async fn body(&mut self) -> Result<Bytes, TransferError> {
        self.resolve().await.map(|response| response.body().clone())
    }

    /// The body as text, invalid UTF-8 is replaced.
    pub async fn text(&mut self) -> Result<String, TransferError> {
        let body = self.body().await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn json<T: DeserializeOwned>(&mut self) -> Result<T, ClientError> {
        let body = self.body().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Waits for the transfer and hands out the response itself.
    pub async fn into_response(mut self) -> TransferOutcome {
        self.resolve().await?;
        match mem::replace(&mut self.state, State::Settled(Err(TransferError::Cancelled))) {
            State::Settled(outcome) => outcome,
            State::Pending(_) => unreachable!("a pending response is settled before it is read"),
        }
    }
}

impl IntoFuture for AsyncResponse {
    type Output = TransferOutcome;
    type IntoFuture = BoxFuture<'static, TransferOutcome>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.into_response())
    }
}

impl Drop for AsyncResponse {
    fn drop(&mut self) {
        if let State::Pending(handle) = &self.state {
            if !handle.is_finished() {
                debug!("response dropped while pending, abort its transfer");
                handle.abort();
            }
        }
    }
}

impl fmt::Debug for AsyncResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Pending(_) => "pending",
            State::Settled(Ok(_)) => "resolved",
            State::Settled(Err(_)) => "failed",
        };
        f.debug_struct("AsyncResponse").field("state", &state).finish()
    }
}
