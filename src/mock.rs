//! `MockTransport` — the injectable fake used to unit test the batching
//! and dispatch engines without a real server.
//!
//! Plain struct behind a `parking_lot::Mutex`, recording every call and
//! replaying canned responses in FIFO order: no mocking framework, just a
//! handful of `Vec`/`VecDeque` fields guarded by a lock.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::executor::{BoxFuture, Executor};
use crate::message::{
    AcknowledgeRequest, ModifyAckDeadlineRequest, PublishRequest, PublishResponse, PullRequest, PullResponse,
};
use crate::status::Status;
use crate::transport::TransportStub;

#[derive(Default)]
struct State {
    publish_calls: Vec<PublishRequest>,
    publish_responses: VecDeque<Result<PublishResponse, Status>>,

    pull_calls: Vec<PullRequest>,
    pull_responses: VecDeque<Result<PullResponse, Status>>,

    acknowledge_calls: Vec<AcknowledgeRequest>,
    modify_ack_deadline_calls: Vec<ModifyAckDeadlineRequest>,
}

/// A fake transport for unit tests. Queue responses with
/// `push_publish_response`/`push_pull_response` before exercising a
/// [`crate::publisher::Publisher`] or [`crate::subscriber::Subscriber`];
/// inspect the recorded calls afterwards.
#[derive(Default, Debug)]
pub struct MockTransport {
    state: Mutex<State>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("publish_calls", &self.publish_calls.len())
            .field("pull_calls", &self.pull_calls.len())
            .field("acknowledge_calls", &self.acknowledge_calls.len())
            .field("modify_ack_deadline_calls", &self.modify_ack_deadline_calls.len())
            .finish()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_publish_response(&self, response: Result<PublishResponse, Status>) {
        self.state.lock().publish_responses.push_back(response);
    }

    pub fn push_pull_response(&self, response: Result<PullResponse, Status>) {
        self.state.lock().pull_responses.push_back(response);
    }

    pub fn publish_calls(&self) -> Vec<PublishRequest> {
        self.state.lock().publish_calls.clone()
    }

    pub fn pull_calls(&self) -> Vec<PullRequest> {
        self.state.lock().pull_calls.clone()
    }

    pub fn acknowledge_calls(&self) -> Vec<AcknowledgeRequest> {
        self.state.lock().acknowledge_calls.clone()
    }

    pub fn modify_ack_deadline_calls(&self) -> Vec<ModifyAckDeadlineRequest> {
        self.state.lock().modify_ack_deadline_calls.clone()
    }
}

impl TransportStub for MockTransport {
    fn create_topic(&self, _fully_qualified_name: String) -> BoxFuture<Result<(), Status>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn list_topics(&self, _project: String) -> BoxFuture<Result<Vec<String>, Status>> {
        Box::pin(std::future::ready(Ok(Vec::new())))
    }

    fn delete_topic(&self, _fully_qualified_name: String) -> BoxFuture<Result<(), Status>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn create_subscription(&self, _fully_qualified_name: String, _topic: String) -> BoxFuture<Result<(), Status>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn list_subscriptions(&self, _project: String) -> BoxFuture<Result<Vec<String>, Status>> {
        Box::pin(std::future::ready(Ok(Vec::new())))
    }

    fn delete_subscription(&self, _fully_qualified_name: String) -> BoxFuture<Result<(), Status>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn pull(&self, request: PullRequest) -> BoxFuture<Result<PullResponse, Status>> {
        let mut state = self.state.lock();
        state.pull_calls.push(request);
        let response = state
            .pull_responses
            .pop_front()
            .unwrap_or_else(|| Ok(PullResponse::default()));
        Box::pin(std::future::ready(response))
    }

    fn acknowledge(&self, request: AcknowledgeRequest) -> BoxFuture<Result<(), Status>> {
        self.state.lock().acknowledge_calls.push(request);
        Box::pin(std::future::ready(Ok(())))
    }

    fn modify_ack_deadline(&self, request: ModifyAckDeadlineRequest) -> BoxFuture<Result<(), Status>> {
        self.state.lock().modify_ack_deadline_calls.push(request);
        Box::pin(std::future::ready(Ok(())))
    }

    fn async_publish(&self, executor: &Arc<dyn Executor>, request: PublishRequest) -> BoxFuture<Result<PublishResponse, Status>> {
        let response = {
            let mut state = self.state.lock();
            state.publish_calls.push(request);
            state
                .publish_responses
                .pop_front()
                .unwrap_or_else(|| Ok(PublishResponse::default()))
        };
        let (tx, rx) = tokio::sync::oneshot::channel();
        executor.spawn(Box::pin(async move {
            let _ = tx.send(response);
        }));
        Box::pin(async move { rx.await.unwrap_or_else(|_| Err(Status::cancelled("mock transport executor dropped"))) })
    }
}
