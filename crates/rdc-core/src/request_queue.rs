use std::sync::Arc;

use rdc_bus::{Envelope, MessageBus};
use rdc_domain::{DomainError, LifecycleExecution, LifecycleRequest};
use rdc_driver::Handler;
use rdc_workspace::DriverFilesWorkspace;
use tracing::{error, info, info_span, Instrument};

use crate::error::CoreError;
use crate::messaging::LifecycleMessaging;
use crate::monitor::ExecutionMonitor;

/// C4 — optional front-end: pulls queued execution requests off the bus
/// and invokes the handler's `execute_lifecycle`; on success, schedules
/// monitoring via C3. Only instantiated when async requests are enabled.
pub struct RequestQueueConsumer<B: MessageBus> {
    bus: Arc<B>,
    request_topic: String,
    failed_topic: String,
    workspace: Arc<DriverFilesWorkspace>,
    handler: Arc<dyn Handler>,
    messaging: Arc<LifecycleMessaging<B>>,
    monitor: Arc<ExecutionMonitor<B>>,
}

impl<B: MessageBus + 'static> RequestQueueConsumer<B> {
    pub fn new(
        bus: Arc<B>,
        request_topic: impl Into<String>,
        failed_topic: impl Into<String>,
        workspace: Arc<DriverFilesWorkspace>,
        handler: Arc<dyn Handler>,
        messaging: Arc<LifecycleMessaging<B>>,
        monitor: Arc<ExecutionMonitor<B>>,
    ) -> Self {
        Self {
            bus,
            request_topic: request_topic.into(),
            failed_topic: failed_topic.into(),
            workspace,
            handler,
            messaging,
            monitor,
        }
    }

    /// Posts `request` onto the request topic for later consumption.
    pub async fn queue_lifecycle_request(&self, request: &LifecycleRequest) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| CoreError::InvalidArgument(format!("unserializable request: {e}")))?;
        let envelope = Envelope::new(&self.request_topic, payload)
            .with_tenant(request.tenant_id.clone())
            .with_partition_key(request.request_id.clone());
        self.bus.post(envelope).await?;
        Ok(())
    }

    /// Runs the consumption loop: decode, build driver files, invoke the
    /// handler, schedule monitoring, release the tree. Runs until the bus
    /// closes the subscription.
    pub async fn run(&self) -> Result<(), CoreError> {
        let mut sub = self.bus.subscribe(&self.request_topic).await?;
        while let Some(envelope) = sub.recv().await {
            self.handle_envelope(envelope).await;
        }
        Ok(())
    }

    async fn handle_envelope(&self, envelope: Envelope) {
        let request: LifecycleRequest = match serde_json::from_slice(&envelope.payload) {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "dropping malformed queued request");
                return;
            }
        };

        let span = info_span!(
            "lifecycle_request",
            request_id = %request.request_id,
            logging_context = ?request.logging_context,
        );

        if let Err(e) = self.handle_request(&request).instrument(span).await {
            error!(request_id = %request.request_id, error = %e, "request consumption failed");
        }
    }

    async fn handle_request(&self, request: &LifecycleRequest) -> Result<(), CoreError> {
        let tree = match self.workspace.build_tree(&request.request_id, &request.driver_files) {
            Ok(tree) => tree,
            Err(e) => {
                return self
                    .fail_permanently(request, DomainError::from(e))
                    .await;
            }
        };

        let result = self
            .handler
            .execute_lifecycle(
                &request.lifecycle_name_normalized(),
                &tree,
                &request.system_properties,
                &request.resource_properties,
                &request.request_properties,
                &request.associated_topology,
                &request.deployment_location,
            )
            .await;

        // The handler is the contractual releaser of the tree it was
        // handed; the core still guarantees release on every exit path so
        // a misbehaving handler can't leak the workspace.
        if let Err(e) = tree.remove_all() {
            error!(request_id = %request.request_id, error = %e, "failed to release driver files tree");
        }

        match result {
            Ok(response) => {
                info!(request_id = %response.request_id, "request accepted, scheduling monitor");
                self.monitor
                    .monitor_execution(
                        Some(response.request_id),
                        Some(request.deployment_location.clone()),
                        request.tenant_id.clone(),
                    )
                    .await?;
                Ok(())
            }
            Err(e) => {
                let domain_err = e.into_domain();
                if domain_err.is_permanent() {
                    self.fail_permanently(request, domain_err).await
                } else {
                    self.requeue_transient(request).await
                }
            }
        }
    }

    async fn fail_permanently(
        &self,
        request: &LifecycleRequest,
        err: DomainError,
    ) -> Result<(), CoreError> {
        let failure = LifecycleExecution::failed(
            request.request_id.clone(),
            err.failure_code(),
            err.to_string(),
        );
        self.messaging
            .send_lifecycle_execution(&failure, request.tenant_id.clone())
            .await?;
        Ok(())
    }

    async fn requeue_transient(&self, request: &LifecycleRequest) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| CoreError::InvalidArgument(format!("unserializable request: {e}")))?;
        let envelope = Envelope::new(&self.failed_topic, payload)
            .with_tenant(request.tenant_id.clone())
            .with_partition_key(request.request_id.clone());
        self.bus.post(envelope).await?;
        Ok(())
    }
}
