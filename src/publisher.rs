//! Publisher batching engine.
//!
//! `Publish` never suspends: it appends under a short lock and returns a
//! future immediately. Flush triggers (count, then bytes, then a hold-time
//! timer armed on the first message of a batch) run under the same short
//! lock; the network call and promise resolution always happen later, on
//! an executor task, with the lock already released.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::executor::{Executor, TimerOutcome};
use crate::message::{Message, PublishRequest, PublishResponse};
use crate::status::{cancelled, invalid_argument, mismatched_message_id_count, Status};
use crate::transport::TransportStub;

/// Batching policy.
#[derive(Debug, Clone)]
pub struct BatchingConfig {
    pub maximum_message_count: usize,
    pub maximum_batch_bytes: usize,
    pub maximum_hold_time: Duration,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            maximum_message_count: 100,
            maximum_batch_bytes: 1024 * 1024,
            maximum_hold_time: Duration::from_millis(10),
        }
    }
}

impl BatchingConfig {
    fn normalized(mut self) -> Self {
        self.maximum_message_count = self.maximum_message_count.max(1);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct PublisherOptions {
    pub batching: BatchingConfig,
}

/// A future satisfied with the server-assigned message id, or the
/// failure status of the batch the message was part of.
pub struct PublishFuture {
    inner: oneshot::Receiver<Result<String, Status>>,
}

impl Future for PublishFuture {
    type Output = Result<String, Status>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(cancelled("publisher dropped before the batch was flushed"))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Default)]
struct PendingBatch {
    messages: Vec<Message>,
    promises: Vec<oneshot::Sender<Result<String, Status>>>,
    byte_count: usize,
}

impl PendingBatch {
    fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

struct EngineState {
    pending: PendingBatch,
    /// Bumped on every flush; an armed hold-time timer compares against
    /// the generation it was armed under and no-ops if it has changed
    /// (guards against an armed timer firing after a size-triggered flush already ran).
    generation: u64,
}

/// Owns the batching engine for one topic. Shared via `Arc` so a timer
/// task or a flush task can hold a reference after `publish()` returns.
pub(crate) struct PublisherConnection {
    topic: String,
    transport: Arc<dyn TransportStub>,
    executor: Arc<dyn Executor>,
    config: BatchingConfig,
    state: Mutex<EngineState>,
}

impl PublisherConnection {
    pub(crate) fn new(
        topic: String,
        transport: Arc<dyn TransportStub>,
        executor: Arc<dyn Executor>,
        config: BatchingConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            topic,
            transport,
            executor,
            config: config.normalized(),
            state: Mutex::new(EngineState {
                pending: PendingBatch::default(),
                generation: 0,
            }),
        })
    }

    pub(crate) fn publish(self: &Arc<Self>, message: Message) -> PublishFuture {
        let size = message.serialized_size();
        let (tx, rx) = oneshot::channel();
        if size > self.config.maximum_batch_bytes {
            let _ = tx.send(Err(invalid_argument(format!(
                "message of {size} bytes exceeds maximum_batch_bytes ({})",
                self.config.maximum_batch_bytes
            ))));
            return PublishFuture { inner: rx };
        }

        let (flush_now, arm_timer, generation_at_arm) = {
            let mut state = self.state.lock();
            state.pending.messages.push(message);
            state.pending.promises.push(tx);
            state.pending.byte_count += size;

            let count = state.pending.messages.len();
            let flush_now =
                count >= self.config.maximum_message_count || state.pending.byte_count >= self.config.maximum_batch_bytes;
            let arm_timer = !flush_now && count == 1;
            (flush_now, arm_timer, state.generation)
        };

        if flush_now {
            tracing::trace!(topic = %self.topic, "flush triggered by size");
            self.flush();
        } else if arm_timer {
            // Weak so an armed timer never keeps the connection alive past
            // its own Drop; if the connection is gone by the time the timer
            // fires, Drop has already cancelled the pending promises.
            let weak = Arc::downgrade(self);
            let executor = self.executor.clone();
            let hold_time = self.config.maximum_hold_time;
            self.executor.spawn(Box::pin(async move {
                if executor.timer(hold_time).await == TimerOutcome::Expired {
                    if let Some(this) = weak.upgrade() {
                        this.flush_if_generation(generation_at_arm);
                    }
                }
            }));
        }

        PublishFuture { inner: rx }
    }

    fn flush_if_generation(self: &Arc<Self>, expected_generation: u64) {
        let stale = {
            let state = self.state.lock();
            state.generation != expected_generation
        };
        if stale {
            return;
        }
        tracing::trace!(topic = %self.topic, "flush triggered by hold-time timer");
        self.flush();
    }

    fn flush(self: &Arc<Self>) {
        let batch = {
            let mut state = self.state.lock();
            if state.pending.is_empty() {
                return;
            }
            state.generation += 1;
            std::mem::take(&mut state.pending)
        };

        let topic = self.topic.clone();
        let transport = self.transport.clone();
        let executor = self.executor.clone();
        self.executor.spawn(Box::pin(async move {
            let PendingBatch { messages, promises, .. } = batch;
            let request = PublishRequest { topic, messages };
            let result = transport.async_publish(&executor, request).await;
            Self::resolve(promises, result);
        }));
    }

    fn resolve(promises: Vec<oneshot::Sender<Result<String, Status>>>, result: Result<PublishResponse, Status>) {
        match result {
            Ok(response) if response.message_ids.len() == promises.len() => {
                for (promise, message_id) in promises.into_iter().zip(response.message_ids) {
                    if promise.send(Ok(message_id)).is_err() {
                        tracing::error!("failed to notify publish submitter: receiver dropped");
                    }
                }
            }
            Ok(_) => {
                for promise in promises {
                    let _ = promise.send(Err(mismatched_message_id_count()));
                }
            }
            Err(status) => {
                for promise in promises {
                    let _ = promise.send(Err(status.clone()));
                }
            }
        }
    }
}

impl Drop for PublisherConnection {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut state.pending);
        tracing::debug!(topic = %self.topic, count = pending.messages.len(), "cancelling pending publishes on shutdown");
        for promise in pending.promises {
            let _ = promise.send(Err(cancelled("publisher connection shut down with messages still pending")));
        }
    }
}

/// Thin, cloneable value type forwarding to a shared [`PublisherConnection`].
#[derive(Clone)]
pub struct Publisher {
    connection: Arc<PublisherConnection>,
}

impl Publisher {
    pub(crate) fn new(
        topic: String,
        transport: Arc<dyn TransportStub>,
        executor: Arc<dyn Executor>,
        options: PublisherOptions,
    ) -> Self {
        Self {
            connection: PublisherConnection::new(topic, transport, executor, options.batching),
        }
    }

    /// Appends `message` to the current batch and returns a future that
    /// resolves to the server-assigned message id, or the failure status
    /// of the batch.
    pub fn publish(&self, message: Message) -> PublishFuture {
        self.connection.publish(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TokioExecutor;
    use crate::mock::MockTransport;

    fn publisher(config: BatchingConfig, transport: Arc<MockTransport>, executor: Arc<TokioExecutor>) -> Publisher {
        Publisher::new(
            "projects/p/topics/t".to_string(),
            transport,
            executor,
            PublisherOptions { batching: config },
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_publish_issues_one_call() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        transport.push_publish_response(Ok(PublishResponse {
            message_ids: vec!["mid-0".to_string()],
        }));
        let publisher = publisher(BatchingConfig::default(), transport.clone(), executor);

        let result = publisher.publish(Message::with_payload("Hello World!")).await;
        assert_eq!(result.unwrap(), "mid-0");
        assert_eq!(transport.publish_calls().len(), 1);
        assert_eq!(transport.publish_calls()[0].messages.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn batches_by_count() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        transport.push_publish_response(Ok(PublishResponse {
            message_ids: vec!["mid-0".to_string(), "mid-1".to_string()],
        }));
        let config = BatchingConfig {
            maximum_message_count: 2,
            ..Default::default()
        };
        let publisher = publisher(config, transport.clone(), executor);

        let a = publisher.publish(Message::with_payload("test-data-0"));
        let b = publisher.publish(Message::with_payload("test-data-1"));
        assert_eq!(a.await.unwrap(), "mid-0");
        assert_eq!(b.await.unwrap(), "mid-1");
        assert_eq!(transport.publish_calls().len(), 1);
        assert_eq!(transport.publish_calls()[0].messages.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn batches_by_bytes() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        transport.push_publish_response(Ok(PublishResponse {
            message_ids: vec!["mid-0".to_string(), "mid-1".to_string()],
        }));
        let single_size = Message::with_payload("test-data-0").serialized_size();
        let config = BatchingConfig {
            maximum_message_count: 4,
            maximum_batch_bytes: single_size + 2,
            ..Default::default()
        };
        let publisher = publisher(config, transport.clone(), executor);

        let a = publisher.publish(Message::with_payload("test-data-0"));
        let b = publisher.publish(Message::with_payload("test-data-1"));
        assert_eq!(a.await.unwrap(), "mid-0");
        assert_eq!(b.await.unwrap(), "mid-1");
        assert_eq!(transport.publish_calls().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2, start_paused = true)]
    async fn batches_by_hold_time() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        transport.push_publish_response(Ok(PublishResponse {
            message_ids: vec!["mid-0".to_string(), "mid-1".to_string()],
        }));
        let config = BatchingConfig {
            maximum_message_count: 4,
            maximum_hold_time: Duration::from_millis(5),
            ..Default::default()
        };
        let publisher = publisher(config, transport.clone(), executor);

        let a = publisher.publish(Message::with_payload("test-data-0"));
        let b = publisher.publish(Message::with_payload("test-data-1"));
        assert_eq!(transport.publish_calls().len(), 0);
        tokio::time::advance(Duration::from_millis(6)).await;
        assert_eq!(a.await.unwrap(), "mid-0");
        assert_eq!(b.await.unwrap(), "mid-1");
        assert_eq!(transport.publish_calls().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn permanent_failure_fails_every_submitter() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        transport.push_publish_response(Err(Status::permission_denied("uh-oh")));
        let config = BatchingConfig {
            maximum_message_count: 2,
            ..Default::default()
        };
        let publisher = publisher(config, transport, executor);

        let a = publisher.publish(Message::with_payload("x"));
        let b = publisher.publish(Message::with_payload("y"));
        let a = a.await.unwrap_err();
        let b = b.await.unwrap_err();
        assert_eq!(a.code(), crate::status::Code::PermissionDenied);
        assert_eq!(a.message(), "uh-oh");
        assert_eq!(b.code(), crate::status::Code::PermissionDenied);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn oversized_message_fails_synchronously_without_calling_transport() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        let config = BatchingConfig {
            maximum_batch_bytes: 4,
            ..Default::default()
        };
        let publisher = publisher(config, transport.clone(), executor);

        let result = publisher.publish(Message::with_payload("way too long")).await;
        assert_eq!(result.unwrap_err().code(), crate::status::Code::InvalidArgument);
        assert_eq!(transport.publish_calls().len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_the_connection_cancels_pending_promises() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        let config = BatchingConfig {
            maximum_message_count: 100,
            maximum_hold_time: Duration::from_secs(3600),
            ..Default::default()
        };
        let connection = PublisherConnection::new("projects/p/topics/t".to_string(), transport, executor, config);
        let fut = connection.publish(Message::with_payload("x"));
        drop(connection);
        assert_eq!(fut.await.unwrap_err().code(), crate::status::Code::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2, start_paused = true)]
    async fn dropping_the_connection_cancels_promises_even_with_a_timer_armed() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        let config = BatchingConfig {
            maximum_message_count: 100,
            maximum_hold_time: Duration::from_millis(50),
            ..Default::default()
        };
        let connection = PublisherConnection::new("projects/p/topics/t".to_string(), transport.clone(), executor, config);
        let fut = connection.publish(Message::with_payload("x"));
        drop(connection);
        assert_eq!(fut.await.unwrap_err().code(), crate::status::Code::Cancelled);

        // Let the armed timer actually fire; it must find the connection
        // gone and no-op rather than flushing against the mock.
        tokio::time::advance(Duration::from_millis(60)).await;
        assert_eq!(transport.publish_calls().len(), 0);
    }
}
