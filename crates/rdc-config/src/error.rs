use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid environment variable {key}: {message}")]
    InvalidEnvVar { key: String, message: String },
}
