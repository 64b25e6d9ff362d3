use async_trait::async_trait;
use rdc_domain::{
    AssociatedTopology, DeploymentLocation, FindReferenceResponse, LifecycleExecuteResponse,
    LifecycleExecution, PropertyValueMap, RequestId,
};
use rdc_workspace::DirectoryTree;

use crate::error::HandlerError;

/// The user-supplied plugin implementing lifecycle operations. The core
/// never inspects driver scripts; it only calls through this trait.
///
/// Re-architected per the design notes this system follows: the handler
/// never calls back into the core (breaking the C3/handler cycle), and its
/// one optional hook is an explicit method with a default no-op rather than
/// something discovered by reflection.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Accepts the request and returns a stable `request_id`. Must return
    /// promptly; long-running work happens on the handler's own time.
    async fn execute_lifecycle(
        &self,
        lifecycle_name: &str,
        driver_files: &DirectoryTree,
        system_properties: &PropertyValueMap,
        resource_properties: &PropertyValueMap,
        request_properties: &PropertyValueMap,
        associated_topology: &AssociatedTopology,
        deployment_location: &DeploymentLocation,
    ) -> Result<LifecycleExecuteResponse, HandlerError>;

    /// Current status of a previously-accepted request.
    ///
    /// Fails with `DomainError::RequestNotFound`,
    /// `DomainError::TemporaryResourceDriverError`, or
    /// `DomainError::ResourceDriverError`.
    async fn get_lifecycle_execution(
        &self,
        request_id: &RequestId,
        deployment_location: &DeploymentLocation,
    ) -> Result<LifecycleExecution, HandlerError>;

    async fn find_reference(
        &self,
        instance_name: &str,
        driver_files: &DirectoryTree,
        deployment_location: &DeploymentLocation,
    ) -> Result<FindReferenceResponse, HandlerError>;

    /// Housekeeping hook invoked after a completion event is published.
    /// Its failures must never affect the completion outcome; callers are
    /// expected to log and swallow any error this returns.
    async fn post_lifecycle_response(
        &self,
        _request_id: &RequestId,
        _deployment_location: &DeploymentLocation,
    ) -> Result<(), HandlerError> {
        Ok(())
    }
}
