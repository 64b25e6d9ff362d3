mod bus;
mod envelope;
pub mod error;
mod queue;

pub use bus::{InMemoryBus, MessageBus, Subscription};
pub use envelope::Envelope;
pub use error::{BusError, QueueError};
pub use queue::{JobHandler, JobQueue};
