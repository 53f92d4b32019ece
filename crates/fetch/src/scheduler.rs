//! Where transfers run.
//!
//! Every transfer is a task on a [`Scheduler`]. Unless a client is given one, it uses a
//! process wide runtime with a single worker thread, created the first time it is needed.
//! One thread is enough: transfers spend their time waiting on sockets and timers, and the
//! I/O driver multiplexes all of them.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::info;

static SHARED_RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    info!("starting the shared transfer runtime");
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("micro-fetch-scheduler")
        .enable_all()
        .build()
        .expect("can't build the shared transfer runtime")
});

/// A handle to the executor transfers are spawned on.
#[derive(Debug, Clone)]
pub struct Scheduler {
    handle: Handle,
}

impl Scheduler {
    /// The process wide scheduler.
    pub fn global() -> Self {
        Self { handle: SHARED_RUNTIME.handle().clone() }
    }

    /// The runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Registers `future` and returns immediately, safe to call from any thread or task.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Runs `future` to completion for callers outside any async context.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::global()
    }
}
