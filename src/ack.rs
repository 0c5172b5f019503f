//! Acknowledgement handler.
//!
//! One-shot, move-only in spirit: cloning an `AckHandler` is allowed (a
//! handler may want to hand a copy to a retry path before committing to
//! one), but the underlying ack_id carries a single shared sentinel, so at
//! most one of `ack()`/`nack()` across all clones ever reaches the
//! transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::executor::Executor;
use crate::message::{AcknowledgeRequest, ModifyAckDeadlineRequest};
use crate::transport::TransportStub;

#[derive(Clone, Debug)]
pub struct AckHandler {
    subscription_full_name: Arc<str>,
    ack_id: Arc<str>,
    transport: Arc<dyn TransportStub>,
    executor: Arc<dyn Executor>,
    consumed: Arc<AtomicBool>,
}

impl AckHandler {
    pub(crate) fn new(
        subscription_full_name: impl Into<Arc<str>>,
        ack_id: impl Into<Arc<str>>,
        transport: Arc<dyn TransportStub>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            subscription_full_name: subscription_full_name.into(),
            ack_id: ack_id.into(),
            transport,
            executor,
            consumed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn ack_id(&self) -> &str {
        &self.ack_id
    }

    /// Acknowledges the delivery. Best-effort and non-blocking: the
    /// `Acknowledge` call runs on the executor; failure is logged, not
    /// surfaced to the caller.
    pub fn ack(&self) {
        if !self.claim() {
            return;
        }
        let transport = self.transport.clone();
        let subscription = self.subscription_full_name.to_string();
        let ack_id = self.ack_id.to_string();
        self.executor.spawn(Box::pin(async move {
            let request = AcknowledgeRequest {
                subscription,
                ack_ids: vec![ack_id.clone()],
            };
            if let Err(status) = transport.acknowledge(request).await {
                tracing::warn!(ack_id = %ack_id, status = ?status, "ack failed; message will be redelivered");
            }
        }));
    }

    /// Negatively acknowledges the delivery by zeroing the ack deadline,
    /// making the server redeliver as soon as possible.
    pub fn nack(&self) {
        if !self.claim() {
            return;
        }
        let transport = self.transport.clone();
        let subscription = self.subscription_full_name.to_string();
        let ack_id = self.ack_id.to_string();
        self.executor.spawn(Box::pin(async move {
            let request = ModifyAckDeadlineRequest {
                subscription,
                ack_ids: vec![ack_id.clone()],
                ack_deadline_seconds: 0,
            };
            if let Err(status) = transport.modify_ack_deadline(request).await {
                tracing::warn!(ack_id = %ack_id, status = ?status, "nack failed; message will be redelivered anyway");
            }
        }));
    }

    /// Returns `true` the first time it is called across this handler and
    /// all of its clones; `false` on every call after that.
    fn claim(&self) -> bool {
        if self.consumed.swap(true, Ordering::SeqCst) {
            tracing::error!(ack_id = %self.ack_id, "ack()/nack() called more than once; ignoring");
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TokioExecutor;
    use crate::mock::MockTransport;
    use std::time::Duration;

    fn handler(transport: Arc<MockTransport>, executor: Arc<TokioExecutor>) -> AckHandler {
        AckHandler::new("projects/p/subscriptions/s", "ack-0", transport, executor)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ack_sends_exactly_one_acknowledge_call() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        let h = handler(transport.clone(), executor);
        h.ack();
        h.ack();
        let clone = h.clone();
        clone.nack();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.acknowledge_calls().len(), 1);
        assert_eq!(transport.modify_ack_deadline_calls().len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn nack_modifies_ack_deadline_to_zero() {
        let executor = Arc::new(TokioExecutor::from_handle(tokio::runtime::Handle::current()));
        let transport = Arc::new(MockTransport::new());
        let h = handler(transport.clone(), executor);
        h.nack();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let calls = transport.modify_ack_deadline_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].ack_deadline_seconds, 0);
        assert_eq!(calls[0].ack_ids, vec!["ack-0".to_string()]);
    }

    #[test]
    fn ack_id_accessor() {
        let executor = Arc::new(TokioExecutor::new(1).unwrap());
        let transport = Arc::new(MockTransport::new());
        let h = handler(transport, executor);
        assert_eq!(h.ack_id(), "ack-0");
    }
}
