use rdc_domain::DomainError;
use thiserror::Error;

/// Errors a handler implementation can raise. Wraps the shared taxonomy so
/// every crate downstream of `rdc-driver` matches on the same kinds rather
/// than inventing handler-specific variants.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl HandlerError {
    pub fn into_domain(self) -> DomainError {
        match self {
            HandlerError::Domain(e) => e,
        }
    }
}
