//! Completion queue / background executor abstraction.
//!
//! All user-visible continuations — publish completions, subscribe
//! handlers, ack/nack side effects — run on this executor, never on the
//! thread that called `Publish`/`Subscribe`. The library owns a
//! `TokioExecutor` by default; `ConnectionOptions::executor` lets a caller
//! supply one backed by an existing `tokio::runtime::Handle` instead, which
//! also disables the library's own worker threads.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Outcome of a timer armed via [`Executor::timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// The delay elapsed.
    Expired,
    /// The executor shut down before the delay elapsed.
    Cancelled,
}

/// A cooperative task queue with timers.
///
/// Implementations MUST be thread-safe and MUST NOT run a submitted task
/// on the calling thread.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Schedules `task` for execution on any worker thread.
    fn spawn(&self, task: BoxFuture<()>);

    /// Returns a future that resolves after `delay`, or immediately with
    /// `TimerOutcome::Cancelled` if the executor is shut down first.
    fn timer(&self, delay: Duration) -> BoxFuture<TimerOutcome>;

    /// Drains: no further tasks are accepted and pending timers resolve
    /// with `TimerOutcome::Cancelled`.
    fn shutdown(&self);
}

/// The default executor: a multi-thread tokio runtime, either owned by
/// this value or borrowed from the caller's.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    // Keeps an owned runtime alive for the lifetime of the executor when
    // one was created internally; `None` when `handle` borrows a runtime
    // the caller already owns.
    _owned_runtime: Option<Arc<Runtime>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioExecutor").finish_non_exhaustive()
    }
}

impl TokioExecutor {
    /// Spins up an owned multi-thread runtime with `worker_threads` workers
    /// (minimum 1). This is what the library uses when `ConnectionOptions`
    /// carries no externally-owned executor.
    pub fn new(worker_threads: usize) -> std::io::Result<Self> {
        let worker_threads = worker_threads.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            handle,
            _owned_runtime: Some(Arc::new(runtime)),
            shutdown: CancellationToken::new(),
        })
    }

    /// Wraps a runtime handle the caller already owns. Disables the
    /// library's own background threads, per `ConnectionOptions`.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _owned_runtime: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Blocks the calling thread until `shutdown()` is invoked. tokio's own
    /// workers are already running independently of this call, so this
    /// exists only for callers (e.g. a CLI) that want a blocking "serve"
    /// point.
    pub async fn parked(&self) {
        self.shutdown.cancelled().await;
    }
}

impl Executor for TokioExecutor {
    fn spawn(&self, task: BoxFuture<()>) {
        self.handle.spawn(task);
    }

    fn timer(&self, delay: Duration) -> BoxFuture<TimerOutcome> {
        let shutdown = self.shutdown.clone();
        Box::pin(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => TimerOutcome::Expired,
                _ = shutdown.cancelled() => TimerOutcome::Cancelled,
            }
        })
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
