use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logging::LoggingContext;

/// Opaque request identity, minted by the service facade at admission and
/// carried unchanged through every subsequent component.
pub type RequestId = String;

pub fn new_request_id() -> RequestId {
    Uuid::new_v4().to_string()
}

/// A single typed property value: an opaque type tag plus a JSON value.
/// Consumers that don't recognise `type_name` treat the value as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: serde_json::Value,
}

/// An ordered `name -> {type, value}` mapping. Order is preserved because
/// some lifecycle scripts are sensitive to the order properties were
/// declared in.
pub type PropertyValueMap = IndexMap<String, PropertyValue>;

/// One entry of an associated-topology mapping: an external resource's id
/// and type, carried forward from a prior lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// External resources created by earlier transitions, keyed by name.
pub type AssociatedTopology = IndexMap<String, TopologyEntry>;

/// Opaque mapping describing where a resource lives (cluster, region,
/// credentials reference). The core never interprets this; it is handed to
/// the handler verbatim.
pub type DeploymentLocation = serde_json::Value;

/// An immutable record assembled at admission. `request_id` is the stable
/// identity used across every subsequent component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRequest {
    pub request_id: RequestId,
    pub lifecycle_name: String,
    /// base64 of a ZIP archive of driver scripts.
    pub driver_files: String,
    #[serde(default)]
    pub system_properties: PropertyValueMap,
    #[serde(default)]
    pub resource_properties: PropertyValueMap,
    #[serde(default)]
    pub request_properties: PropertyValueMap,
    #[serde(default)]
    pub associated_topology: AssociatedTopology,
    pub deployment_location: DeploymentLocation,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub logging_context: LoggingContext,
}

impl LifecycleRequest {
    /// `lifecycle_name` is compared case-insensitively everywhere it matters.
    pub fn lifecycle_name_normalized(&self) -> String {
        self.lifecycle_name.to_ascii_lowercase()
    }
}

/// Terminal or in-flight status of a lifecycle execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleExecutionStatus {
    InProgress,
    Complete,
    Failed,
}

impl LifecycleExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Closed set of failure codes a `FailureDetails` can carry. Taken from the
/// error taxonomy; `InternalError` corresponds to the catch-all
/// `ResourceDriverError` kind and to any unexpected exception caught by the
/// monitor poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    InvalidRequest,
    InvalidLifecycleName,
    InvalidDriverFiles,
    UnreachableDeploymentLocation,
    InfrastructureNotFound,
    RequestNotFound,
    TemporaryResourceDriverError,
    InternalError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetails {
    pub code: FailureCode,
    pub description: String,
}

/// The result shape returned by the handler and forwarded to the bus. When
/// `status` is terminal the record is immutable and suitable for
/// publication as a completion event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleExecution {
    pub request_id: RequestId,
    pub status: LifecycleExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<PropertyValueMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_topology: Option<AssociatedTopology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<FailureDetails>,
}

impl LifecycleExecution {
    pub fn failed(request_id: impl Into<String>, code: FailureCode, description: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: LifecycleExecutionStatus::Failed,
            outputs: None,
            associated_topology: None,
            failure_details: Some(FailureDetails {
                code,
                description: description.into(),
            }),
        }
    }
}

/// Returned by the handler's `execute_lifecycle` and echoed to the HTTP
/// caller: accepts the request and returns a stable identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleExecuteResponse {
    pub request_id: RequestId,
}

/// Returned by the handler's `find_reference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindReferenceResponse {
    #[serde(default)]
    pub outputs: PropertyValueMap,
}

pub const LIFECYCLE_EXECUTION_MONITOR_JOB_TYPE: &str = "LifecycleExecutionMonitoring";

/// The poll unit consumed by the execution monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorJob {
    pub job_type: String,
    #[serde(default)]
    pub request_id: Option<RequestId>,
    #[serde(default)]
    pub deployment_location: Option<DeploymentLocation>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl MonitorJob {
    pub fn new(
        request_id: RequestId,
        deployment_location: DeploymentLocation,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            job_type: LIFECYCLE_EXECUTION_MONITOR_JOB_TYPE.to_string(),
            request_id: Some(request_id),
            deployment_location: Some(deployment_location),
            tenant_id,
        }
    }

    /// A job missing either of these fields is poison: the monitor logs a
    /// warning and drops it rather than attempting to act on it.
    pub fn is_well_formed(&self) -> bool {
        self.request_id.is_some() && self.deployment_location.is_some()
    }
}
