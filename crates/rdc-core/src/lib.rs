pub mod error;
mod messaging;
mod monitor;
mod request_queue;
mod service;

pub use error::CoreError;
pub use messaging::LifecycleMessaging;
pub use monitor::ExecutionMonitor;
pub use request_queue::RequestQueueConsumer;
pub use service::{DispatchMode, ExecuteLifecycleArgs, ResourceDriverService};
