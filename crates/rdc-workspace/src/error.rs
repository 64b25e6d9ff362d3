use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid driver files: {0}")]
    InvalidDriverFiles(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
