use std::sync::Arc;

use rdc_bus::{JobQueue, MessageBus};
use rdc_domain::{
    DeploymentLocation, DomainError, FailureCode, LifecycleExecution, MonitorJob, RequestId,
    LIFECYCLE_EXECUTION_MONITOR_JOB_TYPE,
};
use rdc_driver::Handler;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::messaging::LifecycleMessaging;

/// C3 — background poller that repeatedly asks the handler for a request's
/// status; on terminal status, publishes via C2; on transient error,
/// self-requeues.
pub struct ExecutionMonitor<B: MessageBus> {
    job_queue: Arc<JobQueue<B>>,
}

impl<B: MessageBus + 'static> ExecutionMonitor<B> {
    /// Registers the poll handler under `"LifecycleExecutionMonitoring"`.
    /// Fails if a handler for that job type is already registered —
    /// this is meant to be called exactly once, at startup.
    pub async fn new<H: Handler + 'static>(
        job_queue: Arc<JobQueue<B>>,
        handler: Arc<H>,
        messaging: Arc<LifecycleMessaging<B>>,
    ) -> Result<Self, CoreError> {
        let poll_handler: rdc_bus::JobHandler = Arc::new(move |job: serde_json::Value| {
            let handler = handler.clone();
            let messaging = messaging.clone();
            Box::pin(async move { poll_once(job, handler, messaging).await })
                as std::pin::Pin<Box<dyn std::future::Future<Output = bool> + Send>>
        });

        job_queue
            .register_job_handler(LIFECYCLE_EXECUTION_MONITOR_JOB_TYPE, poll_handler)
            .await?;

        Ok(Self { job_queue })
    }

    /// Emits exactly one `MonitorJob` onto the job queue and returns.
    /// Refuses with `InvalidArgument` when either `request_id` or
    /// `deployment_location` is absent.
    pub async fn monitor_execution(
        &self,
        request_id: Option<RequestId>,
        deployment_location: Option<DeploymentLocation>,
        tenant_id: Option<String>,
    ) -> Result<(), CoreError> {
        let request_id = request_id
            .ok_or_else(|| CoreError::InvalidArgument("request_id is required".to_string()))?;
        let deployment_location = deployment_location.ok_or_else(|| {
            CoreError::InvalidArgument("deployment_location is required".to_string())
        })?;

        let job = MonitorJob::new(request_id, deployment_location, tenant_id);
        let value = serde_json::to_value(&job)
            .map_err(|e| CoreError::InvalidArgument(format!("unserializable job: {e}")))?;
        self.job_queue.queue_job(value).await?;
        Ok(())
    }

    /// Runs the monitor's consume loop until the bus closes its
    /// subscription.
    pub async fn run(&self) -> Result<(), CoreError> {
        self.job_queue.run().await?;
        Ok(())
    }
}

async fn poll_once<B: MessageBus, H: Handler>(
    job: serde_json::Value,
    handler: Arc<H>,
    messaging: Arc<LifecycleMessaging<B>>,
) -> bool {
    let job: MonitorJob = match serde_json::from_value(job) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "dropping malformed monitor job");
            return true;
        }
    };

    // Poison job: missing request_id or deployment_location. Drop it
    // rather than risk blocking the queue on something unactionable.
    if !job.is_well_formed() {
        warn!("dropping monitor job missing request_id or deployment_location");
        return true;
    }
    let request_id = job.request_id.unwrap();
    let deployment_location = job.deployment_location.unwrap();

    let outcome = handler
        .get_lifecycle_execution(&request_id, &deployment_location)
        .await;

    let execution = match outcome {
        Ok(execution) => execution,
        Err(err) => {
            let domain_err = err.into_domain();
            return match domain_err {
                DomainError::RequestNotFound(_) => {
                    debug!(request_id, "request not found, dropping monitor job");
                    true
                }
                DomainError::TemporaryResourceDriverError(msg) => {
                    debug!(request_id, message = %msg, "transient error, requeueing");
                    false
                }
                other => {
                    warn!(request_id, error = %other, "unexpected error, publishing as failed");
                    let failed = LifecycleExecution::failed(
                        request_id.clone(),
                        FailureCode::InternalError,
                        other.to_string(),
                    );
                    if let Err(e) = messaging
                        .send_lifecycle_execution(&failed, job.tenant_id.clone())
                        .await
                    {
                        warn!(request_id, error = %e, "failed to publish synthesized failure");
                    }
                    true
                }
            };
        }
    };

    if execution.status.is_terminal() {
        if let Err(e) = messaging
            .send_lifecycle_execution(&execution, job.tenant_id.clone())
            .await
        {
            warn!(request_id, error = %e, "failed to publish completion event");
        }
        if let Err(e) = handler
            .post_lifecycle_response(&request_id, &deployment_location)
            .await
        {
            debug!(request_id, error = %e, "post_lifecycle_response hook failed, swallowing");
        }
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rdc_bus::InMemoryBus;
    use rdc_domain::{
        AssociatedTopology, LifecycleExecuteResponse, LifecycleExecutionStatus, PropertyValueMap,
    };
    use rdc_driver::HandlerError;
    use rdc_workspace::DirectoryTree;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct ScriptedHandler {
        outcomes: Mutex<Vec<Result<LifecycleExecution, DomainError>>>,
        post_calls: AtomicUsize,
    }

    #[async_trait]
    impl Handler for ScriptedHandler {
        async fn execute_lifecycle(
            &self,
            _lifecycle_name: &str,
            _driver_files: &DirectoryTree,
            _system_properties: &PropertyValueMap,
            _resource_properties: &PropertyValueMap,
            _request_properties: &PropertyValueMap,
            _associated_topology: &AssociatedTopology,
            _deployment_location: &DeploymentLocation,
        ) -> Result<LifecycleExecuteResponse, HandlerError> {
            unimplemented!("not exercised in these tests")
        }

        async fn get_lifecycle_execution(
            &self,
            _request_id: &RequestId,
            _deployment_location: &DeploymentLocation,
        ) -> Result<LifecycleExecution, HandlerError> {
            let mut outcomes = self.outcomes.lock().await;
            outcomes.remove(0).map_err(HandlerError::Domain)
        }

        async fn find_reference(
            &self,
            _instance_name: &str,
            _driver_files: &DirectoryTree,
            _deployment_location: &DeploymentLocation,
        ) -> Result<rdc_domain::FindReferenceResponse, HandlerError> {
            unimplemented!("not exercised in these tests")
        }

        async fn post_lifecycle_response(
            &self,
            _request_id: &RequestId,
            _deployment_location: &DeploymentLocation,
        ) -> Result<(), HandlerError> {
            self.post_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn setup(
        outcomes: Vec<Result<LifecycleExecution, DomainError>>,
    ) -> (Arc<InMemoryBus>, ExecutionMonitor<InMemoryBus>) {
        let bus = Arc::new(InMemoryBus::new());
        let messaging = Arc::new(LifecycleMessaging::new(bus.clone(), "completion").unwrap());
        let job_queue = Arc::new(JobQueue::new(bus.clone(), "monitor"));
        let handler = Arc::new(ScriptedHandler {
            outcomes: Mutex::new(outcomes),
            post_calls: AtomicUsize::new(0),
        });
        let monitor = ExecutionMonitor::new(job_queue, handler, messaging)
            .await
            .unwrap();
        (bus, monitor)
    }

    #[tokio::test]
    async fn complete_publishes_and_finishes() {
        let (bus, monitor) = setup(vec![Ok(LifecycleExecution {
            request_id: "r1".to_string(),
            status: LifecycleExecutionStatus::Complete,
            outputs: None,
            associated_topology: None,
            failure_details: None,
        })])
        .await;
        let mut completion_sub = bus.subscribe("completion").await.unwrap();

        monitor
            .monitor_execution(
                Some("r1".to_string()),
                Some(serde_json::json!({"region": "eu"})),
                None,
            )
            .await
            .unwrap();

        let run_handle = tokio::spawn({
            let monitor = Arc::new(monitor);
            async move { monitor.run().await }
        });

        let envelope = tokio::time::timeout(std::time::Duration::from_secs(1), completion_sub.recv())
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&envelope.payload).unwrap();
        assert_eq!(value["requestId"], "r1");
        assert_eq!(value["status"], "COMPLETE");
        run_handle.abort();
    }

    #[tokio::test]
    async fn transient_error_requeues_without_publishing() {
        let (bus, monitor) = setup(vec![
            Err(DomainError::TemporaryResourceDriverError("try again".to_string())),
            Ok(LifecycleExecution {
                request_id: "r1".to_string(),
                status: LifecycleExecutionStatus::Complete,
                outputs: None,
                associated_topology: None,
                failure_details: None,
            }),
        ])
        .await;
        let mut completion_sub = bus.subscribe("completion").await.unwrap();

        monitor
            .monitor_execution(Some("r1".to_string()), Some(serde_json::json!({})), None)
            .await
            .unwrap();

        let run_handle = tokio::spawn({
            let monitor = Arc::new(monitor);
            async move { monitor.run().await }
        });

        let envelope = tokio::time::timeout(std::time::Duration::from_secs(1), completion_sub.recv())
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&envelope.payload).unwrap();
        assert_eq!(value["status"], "COMPLETE");
        run_handle.abort();
    }

    #[tokio::test]
    async fn unexpected_error_publishes_synthesized_failure() {
        let (bus, monitor) = setup(vec![Err(DomainError::ResourceDriverError("boom".to_string()))]).await;
        let mut completion_sub = bus.subscribe("completion").await.unwrap();

        monitor
            .monitor_execution(Some("r1".to_string()), Some(serde_json::json!({})), None)
            .await
            .unwrap();

        let run_handle = tokio::spawn({
            let monitor = Arc::new(monitor);
            async move { monitor.run().await }
        });

        let envelope = tokio::time::timeout(std::time::Duration::from_secs(1), completion_sub.recv())
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&envelope.payload).unwrap();
        assert_eq!(value["status"], "FAILED");
        assert_eq!(value["failureDetails"]["code"], "INTERNAL_ERROR");
        assert_eq!(value["failureDetails"]["description"], "boom");
        run_handle.abort();
    }

    #[tokio::test]
    async fn monitor_execution_requires_both_fields() {
        let (_bus, monitor) = setup(vec![]).await;
        assert!(monitor.monitor_execution(None, Some(serde_json::json!({})), None).await.is_err());
        assert!(monitor.monitor_execution(Some("r1".to_string()), None, None).await.is_err());
    }
}
