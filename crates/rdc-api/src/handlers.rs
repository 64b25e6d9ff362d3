use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use rdc_bus::MessageBus;
use rdc_core::ExecuteLifecycleArgs;
use rdc_domain::{AssociatedTopology, DeploymentLocation, LoggingContext, PropertyValueMap};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteLifecycleBody {
    pub lifecycle_name: String,
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
}

/// `POST /lifecycle/execute`. The optional `tenantId` header is echoed
/// back on the response; every other header becomes a logging-context
/// entry restored at the start of each downstream unit of work.
pub async fn execute_lifecycle<B: MessageBus + 'static>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
    Json(body): Json<ExecuteLifecycleBody>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant_id = header_str(&headers, "tenantId");
    let logging_context = capture_logging_context(&headers);

    let args = ExecuteLifecycleArgs {
        lifecycle_name: body.lifecycle_name,
        driver_files: body.driver_files,
        system_properties: body.system_properties,
        resource_properties: body.resource_properties,
        request_properties: body.request_properties,
        associated_topology: body.associated_topology,
        deployment_location: body.deployment_location,
        tenant_id: tenant_id.clone(),
        logging_context,
    };

    let response = state.service.execute_lifecycle(args).await?;

    let mut headers_out = HeaderMap::new();
    if let Some(tenant_id) = tenant_id {
        if let Ok(value) = axum::http::HeaderValue::from_str(&tenant_id) {
            headers_out.insert("tenantId", value);
        }
    }

    Ok((
        axum::http::StatusCode::ACCEPTED,
        headers_out,
        axum::Json(response),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindReferenceBody {
    pub instance_name: String,
    pub driver_files: String,
    pub deployment_location: DeploymentLocation,
}

/// `POST /references/find`. Always synchronous.
pub async fn find_reference<B: MessageBus + 'static>(
    State(state): State<AppState<B>>,
    Json(body): Json<FindReferenceBody>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .service
        .find_reference(&body.instance_name, &body.driver_files, body.deployment_location)
        .await?;
    Ok(axum::Json(response))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Every header other than the ones carrying routing/body concerns becomes
/// a correlation entry, matching the "restore context at the start of each
/// unit of work" design rather than the source's process-wide mutable
/// context.
fn capture_logging_context(headers: &HeaderMap) -> LoggingContext {
    let mut context = LoggingContext::new();
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            context.insert(name.as_str().to_string(), value.to_string());
        }
    }
    context
}
