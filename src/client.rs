//! Project-scoped entry point.
//!
//! `Client` owns the shared executor and transport and mints `Publisher`/
//! `Subscriber` facades. Administration (create/delete/list topics and
//! subscriptions) is exposed here only for completeness — the core itself
//! never calls these methods, and a caller that only ever publishes or
//! subscribes need not touch them.

use std::env;
use std::sync::Arc;

use crate::executor::{Executor, TokioExecutor};
use crate::identifiers::{Subscription, Topic};
use crate::publisher::{Publisher, PublisherOptions};
use crate::status::Status;
use crate::subscriber::{Subscriber, SubscriberConfig};
use crate::transport::TransportStub;

const DEFAULT_ENDPOINT: &str = "pubsub.googleapis.com:443";
const EMULATOR_HOST_ENV: &str = "PUBSUB_EMULATOR_HOST";

/// Connection-level tuning independent of any one topic or subscription.
pub struct ConnectionOptions {
    /// Overrides the default `pubsub.googleapis.com:443` endpoint; also
    /// settable via the `PUBSUB_EMULATOR_HOST` environment variable, which
    /// takes precedence when both are set, matching the usual Pub/Sub
    /// emulator convention.
    pub endpoint: Option<String>,
    /// Number of background worker threads for the library's own executor.
    /// Ignored when `executor` is set.
    pub worker_threads: usize,
    /// Supplies an externally-owned executor (e.g. one backed by the
    /// caller's own tokio runtime) instead of having the library spin up
    /// its own worker threads.
    pub executor: Option<Arc<dyn Executor>>,
    /// User-agent prefix pieces prepended to the library's own
    /// `name/version` token.
    pub user_agent_prefix: Vec<String>,
    /// Opaque credentials (a token, a service account blob, whatever the
    /// embedding application already obtained) passed through to the
    /// `TransportStub` constructor. This crate never parses, refreshes, or
    /// otherwise interprets it.
    pub credentials: Option<String>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            worker_threads: 4,
            executor: None,
            user_agent_prefix: Vec::new(),
            credentials: None,
        }
    }
}

impl ConnectionOptions {
    fn resolved_endpoint(&self) -> String {
        env::var(EMULATOR_HOST_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    fn user_agent(&self) -> String {
        let mut pieces = self.user_agent_prefix.clone();
        pieces.push(format!("gcloud-pubsub-core/{}", env!("CARGO_PKG_VERSION")));
        pieces.join(" ")
    }
}

/// Project-scoped handle. Cheap to clone: holds only `Arc`s.
#[derive(Clone)]
pub struct Client {
    project_id: String,
    transport: Arc<dyn TransportStub>,
    executor: Arc<dyn Executor>,
}

impl Client {
    /// Builds a client against an already-constructed transport. Real gRPC
    /// channel/credential setup is peripheral glue this crate does not
    /// perform; callers wire up their own `TransportStub` and hand it in
    /// here.
    pub fn new(project_id: impl Into<String>, transport: Arc<dyn TransportStub>, options: ConnectionOptions) -> std::io::Result<Self> {
        tracing::debug!(
            endpoint = %options.resolved_endpoint(),
            user_agent = %options.user_agent(),
            "constructing pubsub client"
        );
        let executor = match options.executor.clone() {
            Some(executor) => executor,
            None => Arc::new(TokioExecutor::new(options.worker_threads)?),
        };
        Ok(Self {
            project_id: project_id.into(),
            transport,
            executor,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Mints a batching publisher bound to `topic`.
    pub fn publisher(&self, topic: &Topic, options: PublisherOptions) -> Publisher {
        Publisher::new(
            topic.fully_qualified_name(),
            self.transport.clone(),
            self.executor.clone(),
            options,
        )
    }

    /// Mints a pull/dispatch subscriber bound to `subscription`.
    pub fn subscriber(&self, subscription: &Subscription, config: SubscriberConfig) -> Subscriber {
        Subscriber::new(
            subscription.fully_qualified_name(),
            self.transport.clone(),
            self.executor.clone(),
            config,
        )
    }

    pub async fn create_topic(&self, topic: &Topic) -> Result<(), Status> {
        self.transport.create_topic(topic.fully_qualified_name()).await
    }

    pub async fn delete_topic(&self, topic: &Topic) -> Result<(), Status> {
        self.transport.delete_topic(topic.fully_qualified_name()).await
    }

    pub async fn list_topics(&self) -> Result<Vec<String>, Status> {
        self.transport.list_topics(self.project_id.clone()).await
    }

    pub async fn create_subscription(&self, subscription: &Subscription, topic: &Topic) -> Result<(), Status> {
        self.transport
            .create_subscription(subscription.fully_qualified_name(), topic.fully_qualified_name())
            .await
    }

    pub async fn delete_subscription(&self, subscription: &Subscription) -> Result<(), Status> {
        self.transport.delete_subscription(subscription.fully_qualified_name()).await
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<String>, Status> {
        self.transport.list_subscriptions(self.project_id.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn emulator_host_env_takes_precedence() {
        let previous = env::var(EMULATOR_HOST_ENV).ok();
        env::set_var(EMULATOR_HOST_ENV, "localhost:8085");
        let options = ConnectionOptions {
            endpoint: Some("pubsub.googleapis.com:443".to_string()),
            ..Default::default()
        };
        assert_eq!(options.resolved_endpoint(), "localhost:8085");
        match previous {
            Some(value) => env::set_var(EMULATOR_HOST_ENV, value),
            None => env::remove_var(EMULATOR_HOST_ENV),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn mints_publisher_and_subscriber_against_a_mock_transport() {
        let transport = Arc::new(MockTransport::new());
        let client = Client::new(
            "proj",
            transport,
            ConnectionOptions {
                executor: Some(Arc::new(crate::executor::TokioExecutor::from_handle(
                    tokio::runtime::Handle::current(),
                ))),
                ..Default::default()
            },
        )
        .unwrap();

        let topic = Topic::new("proj", "orders").unwrap();
        let subscription = Subscription::new("proj", "orders-worker").unwrap();
        let _publisher = client.publisher(&topic, PublisherOptions::default());
        let _subscriber = client.subscriber(&subscription, SubscriberConfig::default());
        assert_eq!(client.project_id(), "proj");
    }
}
