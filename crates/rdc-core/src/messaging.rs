use std::sync::Arc;

use rdc_bus::{Envelope, MessageBus};
use rdc_domain::LifecycleExecution;

use crate::error::CoreError;

/// C2 — serializes a lifecycle-execution record and publishes it onto the
/// completion topic.
pub struct LifecycleMessaging<B: MessageBus> {
    bus: Arc<B>,
    completion_topic: String,
}

impl<B: MessageBus> LifecycleMessaging<B> {
    /// Fails at construction if the completion topic isn't configured —
    /// that failure is fatal, not something discovered lazily on first
    /// publish.
    pub fn new(bus: Arc<B>, completion_topic: impl Into<String>) -> Result<Self, CoreError> {
        let completion_topic = completion_topic.into();
        if completion_topic.is_empty() {
            return Err(CoreError::InvalidArgument(
                "completion topic must be configured".to_string(),
            ));
        }
        Ok(Self {
            bus,
            completion_topic,
        })
    }

    /// Canonicalizes `execution` to `{requestId, status, outputs,
    /// associatedTopology, failureDetails}` (only present fields emitted)
    /// and posts it keyed by `request_id` so the bus preserves per-request
    /// ordering on the completion topic.
    pub async fn send_lifecycle_execution(
        &self,
        execution: &LifecycleExecution,
        tenant_id: Option<String>,
    ) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(execution)
            .map_err(|e| CoreError::InvalidArgument(format!("unserializable execution: {e}")))?;
        let envelope = Envelope::new(&self.completion_topic, payload)
            .with_tenant(tenant_id)
            .with_partition_key(execution.request_id.clone());
        self.bus.post(envelope).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdc_bus::InMemoryBus;
    use rdc_domain::LifecycleExecutionStatus;

    #[tokio::test]
    async fn publishes_canonical_completion_event() {
        let bus = Arc::new(InMemoryBus::new());
        let messaging = LifecycleMessaging::new(bus.clone(), "completion").unwrap();
        let mut sub = bus.subscribe("completion").await.unwrap();

        let execution = LifecycleExecution {
            request_id: "r1".to_string(),
            status: LifecycleExecutionStatus::Complete,
            outputs: None,
            associated_topology: None,
            failure_details: None,
        };
        messaging
            .send_lifecycle_execution(&execution, None)
            .await
            .unwrap();

        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.partition_key.as_deref(), Some("r1"));
        let value: serde_json::Value = serde_json::from_slice(&envelope.payload).unwrap();
        assert_eq!(value["requestId"], "r1");
        assert_eq!(value["status"], "COMPLETE");
        assert!(value.get("outputs").is_none());
    }

    #[test]
    fn rejects_empty_completion_topic() {
        let bus = Arc::new(InMemoryBus::new());
        assert!(LifecycleMessaging::new(bus, "").is_err());
    }
}
