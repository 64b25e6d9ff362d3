use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rdc_domain::{
    new_request_id, AssociatedTopology, DeploymentLocation, FindReferenceResponse,
    LifecycleExecuteResponse, LifecycleExecution, LifecycleExecutionStatus, PropertyValueMap,
    RequestId,
};
use rdc_workspace::DirectoryTree;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::HandlerError;
use crate::handler::Handler;

#[derive(Debug, Clone)]
struct Tracked {
    execution: LifecycleExecution,
    polls: u32,
}

/// A reference handler that simulates execution in memory with no real
/// infrastructure I/O. Every accepted request reports `IN_PROGRESS` on its
/// first poll and `COMPLETE` from the second poll onward, which is enough
/// to exercise the monitor's requeue behaviour end to end.
pub struct LocalHandler {
    requests: Arc<RwLock<HashMap<RequestId, Tracked>>>,
}

impl Default for LocalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHandler {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl Handler for LocalHandler {
    async fn execute_lifecycle(
        &self,
        lifecycle_name: &str,
        driver_files: &DirectoryTree,
        _system_properties: &PropertyValueMap,
        _resource_properties: &PropertyValueMap,
        _request_properties: &PropertyValueMap,
        _associated_topology: &AssociatedTopology,
        _deployment_location: &DeploymentLocation,
    ) -> Result<LifecycleExecuteResponse, HandlerError> {
        let request_id = new_request_id();
        info!(
            lifecycle_name,
            request_id, root = %driver_files.root().display(),
            "accepted lifecycle request"
        );

        let execution = LifecycleExecution {
            request_id: request_id.clone(),
            status: LifecycleExecutionStatus::InProgress,
            outputs: None,
            associated_topology: None,
            failure_details: None,
        };
        self.requests
            .write()
            .await
            .insert(request_id.clone(), Tracked { execution, polls: 0 });

        Ok(LifecycleExecuteResponse { request_id })
    }

    async fn get_lifecycle_execution(
        &self,
        request_id: &RequestId,
        _deployment_location: &DeploymentLocation,
    ) -> Result<LifecycleExecution, HandlerError> {
        let mut requests = self.requests.write().await;
        let tracked = requests
            .get_mut(request_id)
            .ok_or_else(|| rdc_domain::DomainError::RequestNotFound(request_id.clone()))?;

        tracked.polls += 1;
        if tracked.polls >= 2 {
            tracked.execution.status = LifecycleExecutionStatus::Complete;
        }
        Ok(tracked.execution.clone())
    }

    async fn find_reference(
        &self,
        instance_name: &str,
        _driver_files: &DirectoryTree,
        _deployment_location: &DeploymentLocation,
    ) -> Result<FindReferenceResponse, HandlerError> {
        let mut outputs = PropertyValueMap::new();
        outputs.insert(
            "instanceName".to_string(),
            rdc_domain::PropertyValue {
                type_name: "string".to_string(),
                value: serde_json::Value::String(instance_name.to_string()),
            },
        );
        Ok(FindReferenceResponse { outputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdc_workspace::DriverFilesWorkspace;

    #[tokio::test]
    async fn second_poll_reports_complete() {
        let dir = tempfile::tempdir().unwrap();
        let ws = DriverFilesWorkspace::new(dir.path()).unwrap();
        let zip_base64 = base64_empty_zip();
        let tree = ws.build_tree("r1", &zip_base64).unwrap();

        let handler = LocalHandler::new();
        let response = handler
            .execute_lifecycle(
                "Install",
                &tree,
                &PropertyValueMap::new(),
                &PropertyValueMap::new(),
                &PropertyValueMap::new(),
                &AssociatedTopology::new(),
                &serde_json::json!({}),
            )
            .await
            .unwrap();

        let loc = serde_json::json!({});
        let first = handler
            .get_lifecycle_execution(&response.request_id, &loc)
            .await
            .unwrap();
        assert_eq!(first.status, LifecycleExecutionStatus::InProgress);

        let second = handler
            .get_lifecycle_execution(&response.request_id, &loc)
            .await
            .unwrap();
        assert_eq!(second.status, LifecycleExecutionStatus::Complete);
    }

    #[tokio::test]
    async fn unknown_request_id_is_not_found() {
        let handler = LocalHandler::new();
        let result = handler
            .get_lifecycle_execution(&"missing".to_string(), &serde_json::json!({}))
            .await;
        assert!(matches!(
            result,
            Err(HandlerError::Domain(rdc_domain::DomainError::RequestNotFound(_)))
        ));
    }

    fn base64_empty_zip() -> String {
        use base64::Engine;
        use std::io::Cursor;
        let mut buf = Cursor::new(Vec::new());
        {
            let writer = zip::ZipWriter::new(&mut buf);
            writer.finish().unwrap();
        }
        base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
    }
}
