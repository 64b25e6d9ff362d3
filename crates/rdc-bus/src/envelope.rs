/// A single message posted onto the bus. `topic` plus an optional
/// `partition_key` are the only routing information the bus needs;
/// ordering guarantees (per-`request_id` FIFO on the completion topic) rest
/// entirely on callers setting `partition_key` consistently.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: String,
    pub payload: Vec<u8>,
    pub tenant_id: Option<String>,
    pub partition_key: Option<String>,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            tenant_id: None,
            partition_key: None,
        }
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }
}
