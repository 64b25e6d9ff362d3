use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rdc_core::CoreError;
use rdc_domain::DomainError;
use serde_json::json;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Maps the shared error taxonomy onto status codes per the error table:
/// everything is 400 except the temporary kind (503) and the catch-all
/// (500).
impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let status = match &err {
            DomainError::InvalidRequest(_)
            | DomainError::InvalidLifecycleName(_)
            | DomainError::InvalidDriverFiles(_)
            | DomainError::UnreachableDeploymentLocation(_)
            | DomainError::InfrastructureNotFound(_)
            | DomainError::RequestNotFound(_) => StatusCode::BAD_REQUEST,
            DomainError::TemporaryResourceDriverError(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::ResourceDriverError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Domain(e) => e.into(),
            CoreError::InvalidArgument(msg) => ApiError::bad_request(msg),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
            },
        }
    }
}
