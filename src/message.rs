//! The message data model and the wire shapes the transport stub exchanges.

use std::time::SystemTime;

use indexmap::IndexMap;

/// A message as submitted by a publisher or delivered to a subscriber.
///
/// `message_id` and `publish_time` are server-assigned and therefore absent
/// on a message a caller is about to publish; they are always present on a
/// message a subscriber receives.
///
/// `attributes` preserves insertion order so a subscriber observes them in
/// the same order the publisher set them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub payload: Vec<u8>,
    pub attributes: IndexMap<String, String>,
    pub message_id: Option<String>,
    pub publish_time: Option<SystemTime>,
    pub ordering_key: Option<String>,
}

impl Message {
    pub fn with_payload(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// Wire size used against `BatchingConfig::maximum_batch_bytes`. Proto3
    /// wire size is irrelevant here — the core only needs a stable,
    /// monotonic estimate that the mock and real transports agree on, so a
    /// plain sum of payload + attribute bytes is used.
    pub fn serialized_size(&self) -> usize {
        let attrs: usize = self
            .attributes
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum();
        let ordering = self.ordering_key.as_ref().map_or(0, |k| k.len());
        self.payload.len() + attrs + ordering
    }
}

/// Request carried by `TransportStub::publish`.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub topic: String,
    pub messages: Vec<Message>,
}

/// Response to a successful `publish` call; positionally matched against
/// `PublishRequest::messages`.
#[derive(Debug, Clone, Default)]
pub struct PublishResponse {
    pub message_ids: Vec<String>,
}

/// Request carried by `TransportStub::pull`.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub subscription: String,
    pub max_messages: i32,
    pub return_immediately: bool,
}

/// One delivery: the server's opaque redelivery token paired with the
/// message it names.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message: Message,
}

#[derive(Debug, Clone, Default)]
pub struct PullResponse {
    pub received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Clone)]
pub struct AcknowledgeRequest {
    pub subscription: String,
    pub ack_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModifyAckDeadlineRequest {
    pub subscription: String,
    pub ack_ids: Vec<String>,
    pub ack_deadline_seconds: i32,
}
