use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Per-topic knobs the bus uses when a topic doesn't already exist.
/// Mirrors the defaults the source declares for the request/failed topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfig {
    pub num_partitions: u32,
    pub retention_ms: u64,
    pub auto_create: bool,
}

impl TopicConfig {
    /// 20 partitions / 60s retention — the primary request topic's defaults.
    pub fn primary_request_topic() -> Self {
        Self {
            num_partitions: 20,
            retention_ms: 60_000,
            auto_create: true,
        }
    }

    /// 1 partition — the dead-letter topic for permanently-failed requests.
    pub fn failed_topic() -> Self {
        Self {
            num_partitions: 1,
            retention_ms: 60_000,
            auto_create: true,
        }
    }

    pub fn completion_topic() -> Self {
        Self {
            num_partitions: 1,
            retention_ms: 60_000,
            auto_create: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRequestQueueConfig {
    pub enabled: bool,
    pub group_id: String,
    pub max_poll_interval_ms: u64,
    pub topic_name: String,
    pub topic: TopicConfig,
    pub failed_topic_name: String,
    pub failed_topic: TopicConfig,
}

impl Default for LifecycleRequestQueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            group_id: "request_queue_consumer".to_string(),
            // The source inherits this from the bus client; 300s is a
            // reasonable standalone default for a single in-flight handler call.
            max_poll_interval_ms: 300_000,
            topic_name: "lifecycle_request".to_string(),
            topic: TopicConfig::primary_request_topic(),
            failed_topic_name: "lifecycle_request_failed".to_string(),
            failed_topic: TopicConfig::failed_topic(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDriverConfig {
    pub scripts_workspace: PathBuf,
    pub async_messaging_enabled: bool,
    pub lifecycle_request_queue: LifecycleRequestQueueConfig,
    pub completion_topic_name: String,
    pub bind_addr: SocketAddr,
    pub auth_token: Option<String>,
}

impl Default for ResourceDriverConfig {
    fn default() -> Self {
        Self {
            scripts_workspace: PathBuf::from("./scripts_workspace"),
            async_messaging_enabled: true,
            lifecycle_request_queue: LifecycleRequestQueueConfig::default(),
            completion_topic_name: "lifecycle_execution_events".to_string(),
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            auth_token: None,
        }
    }
}

impl ResourceDriverConfig {
    /// Load from environment variables, falling back to defaults for
    /// anything unset. Unlike the YAML-directory loader this system's
    /// teacher uses for its own domain, this core has one flat config
    /// record, so a small env reader is enough.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("RDC_SCRIPTS_WORKSPACE") {
            cfg.scripts_workspace = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("RDC_ASYNC_MESSAGING_ENABLED") {
            cfg.async_messaging_enabled = parse_bool("RDC_ASYNC_MESSAGING_ENABLED", &v)?;
        }
        if let Ok(v) = std::env::var("RDC_REQUEST_QUEUE_ENABLED") {
            cfg.lifecycle_request_queue.enabled = parse_bool("RDC_REQUEST_QUEUE_ENABLED", &v)?;
        }
        if let Ok(v) = std::env::var("RDC_REQUEST_QUEUE_GROUP_ID") {
            cfg.lifecycle_request_queue.group_id = v;
        }
        if let Ok(v) = std::env::var("RDC_REQUEST_QUEUE_MAX_POLL_INTERVAL_MS") {
            cfg.lifecycle_request_queue.max_poll_interval_ms =
                parse_u64("RDC_REQUEST_QUEUE_MAX_POLL_INTERVAL_MS", &v)?;
        }
        if let Ok(v) = std::env::var("RDC_BIND_ADDR") {
            cfg.bind_addr = v
                .parse()
                .map_err(|e| ConfigError::InvalidEnvVar {
                    key: "RDC_BIND_ADDR".to_string(),
                    message: format!("{e}"),
                })?;
        }
        if let Ok(v) = std::env::var("RDC_AUTH_TOKEN") {
            cfg.auth_token = Some(v);
        }

        if cfg.lifecycle_request_queue.enabled && cfg.lifecycle_request_queue.topic_name.is_empty()
        {
            return Err(ConfigError::Invalid(
                "lifecycle_request_queue.enabled requires a non-empty topic name".to_string(),
            ));
        }

        Ok(cfg)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvVar {
        key: key.to_string(),
        message: format!("expected an integer, got '{value}'"),
    })
}
