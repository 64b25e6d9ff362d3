use thiserror::Error;

/// The error taxonomy shared across every component of the core.
///
/// Variants map 1:1 onto the kinds in the error handling design: HTTP status
/// codes and monitor-job disposition are derived from which variant is
/// raised, not from any ad-hoc string matching downstream.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid lifecycle name: {0}")]
    InvalidLifecycleName(String),

    #[error("invalid driver files: {0}")]
    InvalidDriverFiles(String),

    #[error("unreachable deployment location: {0}")]
    UnreachableDeploymentLocation(String),

    #[error("infrastructure not found: {0}")]
    InfrastructureNotFound(String),

    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("temporary resource driver error: {0}")]
    TemporaryResourceDriverError(String),

    #[error("resource driver error: {0}")]
    ResourceDriverError(String),
}

impl DomainError {
    /// Whether this kind is a permanent failure when encountered while
    /// consuming a queued request (§4.4): every kind except the transient
    /// one synthesizes a FAILED completion and drops the request.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, DomainError::TemporaryResourceDriverError(_))
    }

    /// The failure code this error maps to when synthesizing a
    /// `LifecycleExecution` completion event.
    pub fn failure_code(&self) -> crate::types::FailureCode {
        use crate::types::FailureCode::*;
        match self {
            DomainError::InvalidRequest(_) => InvalidRequest,
            DomainError::InvalidLifecycleName(_) => InvalidLifecycleName,
            DomainError::InvalidDriverFiles(_) => InvalidDriverFiles,
            DomainError::UnreachableDeploymentLocation(_) => UnreachableDeploymentLocation,
            DomainError::InfrastructureNotFound(_) => InfrastructureNotFound,
            DomainError::RequestNotFound(_) => RequestNotFound,
            DomainError::TemporaryResourceDriverError(_) => TemporaryResourceDriverError,
            DomainError::ResourceDriverError(_) => InternalError,
        }
    }
}
