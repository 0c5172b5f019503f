//! # gcloud-pubsub-core
//!
//! Batching publisher and pull/dispatch subscriber pipelines for a Cloud
//! Pub/Sub-style messaging service, built against an injectable
//! [`transport::TransportStub`] rather than a concrete gRPC client. Wiring a
//! real channel, credentials, and wire codec onto that trait is left to the
//! embedding application; this crate owns batching, flushing, dispatch, and
//! acknowledgement.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use gcloud_pubsub_core::client::{Client, ConnectionOptions};
//! use gcloud_pubsub_core::identifiers::Topic;
//! use gcloud_pubsub_core::mock::MockTransport;
//! use gcloud_pubsub_core::message::Message;
//! use gcloud_pubsub_core::publisher::PublisherOptions;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(MockTransport::new());
//! let client = Client::new("local-project", transport, ConnectionOptions::default())?;
//!
//! let topic = Topic::new("local-project", "orders")?;
//! let publisher = client.publisher(&topic, PublisherOptions::default());
//! let message_id = publisher.publish(Message::with_payload("hello")).await?;
//! println!("published {message_id}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Subscribing
//!
//! ```no_run
//! use std::sync::Arc;
//! use gcloud_pubsub_core::client::{Client, ConnectionOptions};
//! use gcloud_pubsub_core::identifiers::Subscription;
//! use gcloud_pubsub_core::mock::MockTransport;
//! use gcloud_pubsub_core::subscriber::SubscriberConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(MockTransport::new());
//! let client = Client::new("local-project", transport, ConnectionOptions::default())?;
//! let subscription = Subscription::new("local-project", "orders-worker")?;
//! let subscriber = client.subscriber(&subscription, SubscriberConfig::default());
//!
//! let session = subscriber.subscribe(|message, ack| {
//!     println!("{:?}", message.payload);
//!     ack.ack();
//! });
//!
//! // Somewhere else: session.cancel();
//! let status = session.await;
//! println!("subscriber session ended: {status:?}");
//! # Ok(())
//! # }
//! ```

pub mod ack;
pub mod client;
pub mod executor;
pub mod identifiers;
pub mod message;
pub mod mock;
pub mod publisher;
pub mod status;
pub mod subscriber;
pub mod transport;
