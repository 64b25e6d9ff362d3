pub mod error;
pub mod logging;
pub mod types;

pub use error::DomainError;
pub use logging::LoggingContext;
pub use types::{
    new_request_id, AssociatedTopology, DeploymentLocation, FailureCode, FailureDetails,
    FindReferenceResponse, LifecycleExecuteResponse, LifecycleExecution, LifecycleExecutionStatus,
    LifecycleRequest, MonitorJob, PropertyValue, PropertyValueMap, RequestId, TopologyEntry,
    LIFECYCLE_EXECUTION_MONITOR_JOB_TYPE,
};
