use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("topic '{0}' is not configured")]
    UnknownTopic(String),

    #[error("failed to publish to '{topic}': {message}")]
    PublishFailed { topic: String, message: String },
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("a handler is already registered for job type '{0}'")]
    DuplicateHandler(String),

    #[error("job is missing required field 'job_type'")]
    MissingJobType,

    #[error(transparent)]
    Bus(#[from] BusError),
}
