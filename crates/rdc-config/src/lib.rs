mod config;
pub mod error;

pub use config::{LifecycleRequestQueueConfig, ResourceDriverConfig, TopicConfig};
pub use error::ConfigError;
