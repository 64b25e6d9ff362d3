use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An explicit, per-request correlation record.
///
/// The source this system is modeled on keeps a process-wide mutable logging
/// context that is set and cleared around each unit of work. That does not
/// survive an async hop into a queue and back, so here the context is a
/// plain value: captured at admission, embedded in whatever gets queued, and
/// restored into the current tracing span at the start of the next unit of
/// work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggingContext(pub BTreeMap<String, String>);

impl LoggingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Fields suitable for recording onto a `tracing::Span`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for LoggingContext {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
