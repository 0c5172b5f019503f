//! Subscriber pull/dispatch engine.
//!
//! One session per `subscribe()` call: a pull loop runs on the executor,
//! and every delivered message is dispatched to the handler on its own
//! executor task so handlers may run concurrently and out of order. The
//! loop terminates the session's future on the first `Pull` failure or on
//! cooperative cancellation; it does not retry transient errors — the
//! reference behavior it preserves is to terminate on any `Pull` error.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::ack::AckHandler;
use crate::executor::Executor;
use crate::message::{Message, PullRequest};
use crate::status::{cancelled, Status};
use crate::transport::TransportStub;

/// Tuning for the subscriber's pull loop.
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// `max_messages` on each `Pull` request.
    pub max_messages_per_pull: i32,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            max_messages_per_pull: 100,
        }
    }
}

/// A handler invoked once per delivered message, on an executor thread.
/// Implementors that need `Clone`able captured state typically wrap it in
/// an `Arc` before constructing the closure.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle(&self, message: Message, ack_handler: AckHandler);
}

impl<F> MessageHandler for F
where
    F: Fn(Message, AckHandler) + Send + Sync + 'static,
{
    fn handle(&self, message: Message, ack_handler: AckHandler) {
        self(message, ack_handler)
    }
}

/// A cancellable future completed when the pull loop stops.
///
/// `cancel()` is cooperative: the loop observes it at its next safe point
/// and completes with `Code::Ok` — routine shutdown should not read as an
/// error to callers.
pub struct SubscribeFuture {
    cancel: CancellationToken,
    result: oneshot::Receiver<Status>,
}

impl SubscribeFuture {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Future for SubscribeFuture {
    type Output = Status;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.result).poll(cx) {
            Poll::Ready(Ok(status)) => Poll::Ready(status),
            Poll::Ready(Err(_)) => Poll::Ready(cancelled("subscriber session dropped without a terminal status")),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Thin, cloneable value type forwarding to the pull loop it starts.
#[derive(Clone)]
pub struct Subscriber {
    subscription_full_name: Arc<str>,
    transport: Arc<dyn TransportStub>,
    executor: Arc<dyn Executor>,
    config: SubscriberConfig,
}

impl Subscriber {
    pub(crate) fn new(
        subscription_full_name: String,
        transport: Arc<dyn TransportStub>,
        executor: Arc<dyn Executor>,
        config: SubscriberConfig,
    ) -> Self {
        Self {
            subscription_full_name: subscription_full_name.into(),
            transport,
            executor,
            config,
        }
    }

    /// Starts a new pull/dispatch session.
    pub fn subscribe<H>(&self, handler: H) -> SubscribeFuture
    where
        H: MessageHandler,
    {
        let cancel = CancellationToken::new();
        let (result_tx, result_rx) = oneshot::channel();

        let session = PullLoop {
            subscription_full_name: self.subscription_full_name.clone(),
            transport: self.transport.clone(),
            executor: self.executor.clone(),
            config: self.config.clone(),
            cancel: cancel.clone(),
            handler: Arc::new(handler),
        };
        self.executor.spawn(Box::pin(async move {
            let status = session.run().await;
            let _ = result_tx.send(status);
        }));

        SubscribeFuture {
            cancel,
            result: result_rx,
        }
    }
}

struct PullLoop<H: MessageHandler + ?Sized> {
    subscription_full_name: Arc<str>,
    transport: Arc<dyn TransportStub>,
    executor: Arc<dyn Executor>,
    config: SubscriberConfig,
    cancel: CancellationToken,
    handler: Arc<H>,
}

impl<H: MessageHandler + ?Sized> PullLoop<H> {
    async fn run(&self) -> Status {
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(subscription = %self.subscription_full_name, "cancelled; stopping pull loop");
                return crate::status::ok();
            }

            let request = PullRequest {
                subscription: self.subscription_full_name.to_string(),
                max_messages: self.config.max_messages_per_pull,
                return_immediately: false,
            };

            let pulled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!(subscription = %self.subscription_full_name, "cancelled mid-pull; stopping");
                    return crate::status::ok();
                }
                result = self.transport.pull(request) => result,
            };

            let response = match pulled {
                Ok(response) => response,
                Err(status) => {
                    tracing::error!(
                        subscription = %self.subscription_full_name,
                        status = ?status,
                        "pull failed; subscriber session terminating"
                    );
                    return status;
                }
            };

            for received in response.received_messages {
                let ack_handler = AckHandler::new(
                    self.subscription_full_name.clone(),
                    received.ack_id,
                    self.transport.clone(),
                    self.executor.clone(),
                );
                let handler = self.handler.clone();
                let message = received.message;
                self.executor.spawn(Box::pin(async move {
                    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(message, ack_handler)));
                    if outcome.is_err() {
                        tracing::error!("subscriber handler panicked; message left unacked for redelivery");
                    }
                }));
            }
        }
    }
}
