use rdc_bus::{BusError, QueueError};
use rdc_config::ConfigError;
use rdc_domain::DomainError;
use rdc_driver::HandlerError;
use rdc_workspace::WorkspaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<HandlerError> for CoreError {
    fn from(e: HandlerError) -> Self {
        CoreError::Domain(e.into_domain())
    }
}

impl From<WorkspaceError> for DomainError {
    fn from(e: WorkspaceError) -> Self {
        match e {
            WorkspaceError::InvalidDriverFiles(msg) => DomainError::InvalidDriverFiles(msg),
            WorkspaceError::Io(err) => DomainError::ResourceDriverError(err.to_string()),
        }
    }
}
