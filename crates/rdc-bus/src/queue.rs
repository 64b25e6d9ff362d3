use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::bus::MessageBus;
use crate::envelope::Envelope;
use crate::error::QueueError;

/// A registered job handler: given the job's JSON body, returns whether the
/// job is finished. `false` means "leave this for redelivery".
pub type JobHandler =
    Arc<dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// A generic job queue layered over a [`MessageBus`] topic. Jobs are plain
/// JSON objects identified by a `job_type` field; a handler registered for
/// that type decides whether the job is done. An unfinished job (or one
/// with no registered handler) is reposted onto the same topic so the next
/// poll picks it up again — the requeue-on-not-finished protocol the
/// execution monitor (C3) is built on.
pub struct JobQueue<B: MessageBus> {
    bus: Arc<B>,
    topic: String,
    handlers: RwLock<HashMap<String, JobHandler>>,
}

impl<B: MessageBus> JobQueue<B> {
    pub fn new(bus: Arc<B>, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `handler` for `job_type`. Mutated only at startup; a
    /// duplicate registration fails loudly rather than silently replacing
    /// the earlier handler.
    pub async fn register_job_handler(
        &self,
        job_type: impl Into<String>,
        handler: JobHandler,
    ) -> Result<(), QueueError> {
        let job_type = job_type.into();
        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(&job_type) {
            return Err(QueueError::DuplicateHandler(job_type));
        }
        handlers.insert(job_type, handler);
        Ok(())
    }

    /// Posts `job` onto the queue's topic. `job` must be a JSON object with
    /// a non-null `job_type` field.
    pub async fn queue_job(&self, job: serde_json::Value) -> Result<(), QueueError> {
        let job_type = job
            .get("job_type")
            .and_then(|v| v.as_str())
            .ok_or(QueueError::MissingJobType)?
            .to_string();
        let payload = serde_json::to_vec(&job).expect("job is valid JSON");
        self.bus
            .post(Envelope::new(&self.topic, payload).with_partition_key(job_type))
            .await?;
        Ok(())
    }

    /// Runs the consume loop: pulls the next job off the topic, dispatches
    /// it to the registered handler, and requeues it if the handler
    /// reports it isn't finished (or if no handler is registered at all).
    /// Runs until the bus closes the subscription.
    pub async fn run(&self) -> Result<(), QueueError> {
        let mut sub = self.bus.subscribe(&self.topic).await?;
        while let Some(envelope) = sub.recv().await {
            self.dispatch_one(envelope).await;
        }
        Ok(())
    }

    async fn dispatch_one(&self, envelope: Envelope) {
        let job: serde_json::Value = match serde_json::from_slice(&envelope.payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "dropping malformed job payload");
                return;
            }
        };
        let job_type = job.get("job_type").and_then(|v| v.as_str()).map(str::to_string);

        let finished = match job_type.as_deref() {
            None => {
                warn!("dropping job with no job_type");
                true
            }
            Some(job_type) => {
                let handler = self.handlers.read().await.get(job_type).cloned();
                match handler {
                    Some(handler) => handler(job).await,
                    None => {
                        debug!(job_type, "no handler registered, requeueing");
                        false
                    }
                }
            }
        };

        if !finished {
            if let Err(e) = self.bus.post(envelope).await {
                warn!(error = %e, "failed to requeue job");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn duplicate_handler_registration_fails() {
        let bus = Arc::new(InMemoryBus::new());
        let queue = JobQueue::new(bus, "jobs");
        let handler: JobHandler = Arc::new(|_| Box::pin(async { true }));
        queue.register_job_handler("t", handler.clone()).await.unwrap();
        let err = queue.register_job_handler("t", handler).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn queue_job_requires_job_type() {
        let bus = Arc::new(InMemoryBus::new());
        let queue = JobQueue::new(bus, "jobs");
        assert!(queue.queue_job(serde_json::json!({})).await.is_err());
        assert!(queue
            .queue_job(serde_json::json!({"job_type": null}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unfinished_job_is_requeued() {
        let bus = Arc::new(InMemoryBus::new());
        let queue = Arc::new(JobQueue::new(bus, "jobs"));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler: JobHandler = Arc::new(move |_job| {
            let calls = calls_clone.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                n >= 1 // finish on the second delivery
            })
        });
        queue.register_job_handler("poll", handler).await.unwrap();
        queue
            .queue_job(serde_json::json!({"job_type": "poll"}))
            .await
            .unwrap();

        let queue_clone = queue.clone();
        let handle = tokio::spawn(async move { queue_clone.run().await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.abort();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
