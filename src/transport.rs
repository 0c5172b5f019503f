//! The transport stub contract consumed by the core.
//!
//! The core never constructs gRPC channels, credentials, or wire bytes
//! itself — that plumbing is peripheral glue and lives
//! outside this crate, behind whatever implements `TransportStub`. The one
//! implementation this crate carries is [`crate::mock::MockTransport`],
//! used for unit testing the batching and dispatch pipelines.

use std::sync::Arc;

use crate::executor::{BoxFuture, Executor};
use crate::message::{AcknowledgeRequest, ModifyAckDeadlineRequest, PublishRequest, PublishResponse, PullRequest, PullResponse};
use crate::status::Status;

/// Capability object exposing the admin and data-plane RPCs the core
/// depends on. Administration methods are synchronous
/// request/response wrappers used only by the out-of-scope admin
/// surfaces; the core itself calls only `pull`, `acknowledge`,
/// `modify_ack_deadline`, and `async_publish`.
pub trait TransportStub: Send + Sync + std::fmt::Debug {
    fn create_topic(&self, fully_qualified_name: String) -> BoxFuture<Result<(), Status>>;
    fn list_topics(&self, project: String) -> BoxFuture<Result<Vec<String>, Status>>;
    fn delete_topic(&self, fully_qualified_name: String) -> BoxFuture<Result<(), Status>>;

    fn create_subscription(&self, fully_qualified_name: String, topic: String) -> BoxFuture<Result<(), Status>>;
    fn list_subscriptions(&self, project: String) -> BoxFuture<Result<Vec<String>, Status>>;
    fn delete_subscription(&self, fully_qualified_name: String) -> BoxFuture<Result<(), Status>>;

    /// Blocks the calling executor slot until the server responds.
    fn pull(&self, request: PullRequest) -> BoxFuture<Result<PullResponse, Status>>;

    /// Best-effort; the server will redeliver on failure regardless.
    fn acknowledge(&self, request: AcknowledgeRequest) -> BoxFuture<Result<(), Status>>;

    fn modify_ack_deadline(&self, request: ModifyAckDeadlineRequest) -> BoxFuture<Result<(), Status>>;

    /// Issues the publish RPC. `executor` is where the returned future
    /// MUST be satisfied — never on the thread that called
    /// `async_publish`.
    fn async_publish(&self, executor: &Arc<dyn Executor>, request: PublishRequest) -> BoxFuture<Result<PublishResponse, Status>>;
}
