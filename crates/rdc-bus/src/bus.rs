use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::envelope::Envelope;
use crate::error::BusError;

/// A handle to a topic's inbound stream. Each topic has exactly one
/// subscription outstanding at a time, matching the single consumer group
/// per topic this core actually needs (one monitor pool, one request-queue
/// pool).
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }
}

/// The postal-service/inbox-service abstraction the core publishes onto and
/// consumes from. Stands in for whatever real message-bus client a
/// deployment wires in; this crate ships only the in-memory reference
/// implementation used by the CLI's default wiring and by tests.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn post(&self, envelope: Envelope) -> Result<(), BusError>;

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError>;
}

struct Topic {
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: Option<mpsc::UnboundedReceiver<Envelope>>,
}

/// An in-process message bus backed by one unbounded channel per topic.
/// Topics are created on first use (auto-create, matching the
/// configuration default every topic in this system declares).
#[derive(Clone, Default)]
pub struct InMemoryBus {
    topics: std::sync::Arc<tokio::sync::Mutex<std::collections::HashMap<String, Topic>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn post(&self, envelope: Envelope) -> Result<(), BusError> {
        let topic_name = envelope.topic.clone();
        let mut topics = self.topics.lock().await;
        let topic = topics.entry(topic_name.clone()).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            Topic {
                sender,
                receiver: Some(receiver),
            }
        });
        topic.sender.send(envelope).map_err(|_| BusError::PublishFailed {
            topic: topic_name,
            message: "no receiver attached".to_string(),
        })
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        let mut topics = self.topics.lock().await;
        let entry = topics.entry(topic.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            Topic {
                sender,
                receiver: Some(receiver),
            }
        });
        let receiver = entry
            .receiver
            .take()
            .ok_or_else(|| BusError::PublishFailed {
                topic: topic.to_string(),
                message: "topic already has a subscriber".to_string(),
            })?;
        Ok(Subscription { receiver })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn posts_are_delivered_in_order() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe("t1").await.unwrap();
        bus.post(Envelope::new("t1", b"a".to_vec())).await.unwrap();
        bus.post(Envelope::new("t1", b"b".to_vec())).await.unwrap();

        let first = sub.recv().await.unwrap();
        let second = sub.recv().await.unwrap();
        assert_eq!(first.payload, b"a");
        assert_eq!(second.payload, b"b");
    }

    #[tokio::test]
    async fn double_subscribe_fails() {
        let bus = InMemoryBus::new();
        let _sub = bus.subscribe("t1").await.unwrap();
        assert!(bus.subscribe("t1").await.is_err());
    }
}
