use std::sync::Arc;

use rdc_bus::MessageBus;
use rdc_domain::{
    new_request_id, AssociatedTopology, DeploymentLocation, FindReferenceResponse,
    LifecycleExecuteResponse, LoggingContext, PropertyValueMap,
};
use rdc_driver::Handler;
use rdc_workspace::DriverFilesWorkspace;
use tracing::error;

use crate::error::CoreError;
use crate::monitor::ExecutionMonitor;
use crate::request_queue::RequestQueueConsumer;

/// Configuration flags governing C5's dispatch decision. Mirrors
/// `async_requests_enabled`/`async_enabled` from the configuration, but
/// kept as an explicit argument record rather than reaching into a global
/// config object, per the "typed dependency record" re-architecture.
#[derive(Debug, Clone, Copy)]
pub struct DispatchMode {
    pub async_requests_enabled: bool,
    pub async_enabled: bool,
}

/// C5 — facade that accepts a lifecycle request from the HTTP layer,
/// chooses between synchronous handler dispatch and enqueue-to-C4, and
/// returns an accepted-request token.
pub struct ResourceDriverService<B: MessageBus> {
    mode: DispatchMode,
    workspace: Arc<DriverFilesWorkspace>,
    handler: Arc<dyn Handler>,
    monitor: Arc<ExecutionMonitor<B>>,
    request_queue: Option<Arc<RequestQueueConsumer<B>>>,
}

#[allow(clippy::too_many_arguments)]
pub struct ExecuteLifecycleArgs {
    pub lifecycle_name: String,
    pub driver_files: String,
    pub system_properties: PropertyValueMap,
    pub resource_properties: PropertyValueMap,
    pub request_properties: PropertyValueMap,
    pub associated_topology: AssociatedTopology,
    pub deployment_location: DeploymentLocation,
    pub tenant_id: Option<String>,
    pub logging_context: LoggingContext,
}

impl<B: MessageBus + 'static> ResourceDriverService<B> {
    pub fn new(
        mode: DispatchMode,
        workspace: Arc<DriverFilesWorkspace>,
        handler: Arc<dyn Handler>,
        monitor: Arc<ExecutionMonitor<B>>,
        request_queue: Option<Arc<RequestQueueConsumer<B>>>,
    ) -> Result<Self, CoreError> {
        if mode.async_requests_enabled && request_queue.is_none() {
            return Err(CoreError::InvalidArgument(
                "async_requests_enabled requires a request queue consumer".to_string(),
            ));
        }
        Ok(Self {
            mode,
            workspace,
            handler,
            monitor,
            request_queue,
        })
    }

    /// Dispatch decision per the configured flags:
    ///
    /// - `async_requests_enabled`: mint a fresh id, enqueue onto the
    ///   request topic, return immediately. The handler is not called.
    /// - `async_requests_enabled=false, async_enabled=true`: call the
    ///   handler synchronously, schedule a monitor job on acceptance.
    /// - both false: call the handler synchronously, emit nothing.
    pub async fn execute_lifecycle(
        &self,
        args: ExecuteLifecycleArgs,
    ) -> Result<LifecycleExecuteResponse, CoreError> {
        if args.lifecycle_name.trim().is_empty() {
            return Err(CoreError::Domain(rdc_domain::DomainError::InvalidLifecycleName(
                "lifecycle_name must not be empty".to_string(),
            )));
        }

        if self.mode.async_requests_enabled {
            let request_queue = self
                .request_queue
                .as_ref()
                .expect("validated present at construction");

            let request_id = new_request_id();
            let request = rdc_domain::LifecycleRequest {
                request_id: request_id.clone(),
                lifecycle_name: args.lifecycle_name,
                driver_files: args.driver_files,
                system_properties: args.system_properties,
                resource_properties: args.resource_properties,
                request_properties: args.request_properties,
                associated_topology: args.associated_topology,
                deployment_location: args.deployment_location,
                tenant_id: args.tenant_id,
                logging_context: args.logging_context,
            };
            request_queue.queue_lifecycle_request(&request).await?;
            return Ok(LifecycleExecuteResponse { request_id });
        }

        let tree = self
            .workspace
            .build_tree(&new_request_id(), &args.driver_files)
            .map_err(rdc_domain::DomainError::from)?;

        let result = self
            .handler
            .execute_lifecycle(
                &args.lifecycle_name.to_ascii_lowercase(),
                &tree,
                &args.system_properties,
                &args.resource_properties,
                &args.request_properties,
                &args.associated_topology,
                &args.deployment_location,
            )
            .await;

        // The handler's own error takes priority — it's what decides the
        // caller's status code. A cleanup failure alongside it is logged,
        // not returned, so it can't mask the more relevant error.
        if let Err(e) = tree.remove_all() {
            error!(error = %e, "failed to release driver files tree");
        }
        let response = result?;

        if self.mode.async_enabled {
            self.monitor
                .monitor_execution(
                    Some(response.request_id.clone()),
                    Some(args.deployment_location),
                    args.tenant_id,
                )
                .await?;
        }

        Ok(response)
    }

    /// Always synchronous: materialize driver files, call the handler,
    /// return its response.
    pub async fn find_reference(
        &self,
        instance_name: &str,
        driver_files: &str,
        deployment_location: DeploymentLocation,
    ) -> Result<FindReferenceResponse, CoreError> {
        let tree = self
            .workspace
            .build_tree(&new_request_id(), driver_files)
            .map_err(rdc_domain::DomainError::from)?;

        let result = self
            .handler
            .find_reference(instance_name, &tree, &deployment_location)
            .await;

        tree.remove_all().map_err(rdc_domain::DomainError::from)?;
        Ok(result?)
    }
}
