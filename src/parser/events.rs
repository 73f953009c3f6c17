//! Key-space events consumed by the aggregation tree.
//!
//! Event sources (the RDB decoder, the JSON-lines reader) push events into an
//! [`EventSink`]; the tree is one such sink.

use serde::{Deserialize, Serialize};

/// A single key-space event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KeyEvent {
    /// A key was seen in the source
    Observed { key: String },

    /// The payload stored under `key` grew by `bytes`
    Grew { key: String, bytes: u64 },
}

impl KeyEvent {
    pub fn observed(key: impl Into<String>) -> Self {
        Self::Observed { key: key.into() }
    }

    pub fn grew(key: impl Into<String>, bytes: u64) -> Self {
        Self::Grew {
            key: key.into(),
            bytes,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Observed { key } | Self::Grew { key, .. } => key,
        }
    }
}

/// Consumer of key-space events
///
/// Sources call `handle` once per event, in stream order.
pub trait EventSink {
    fn handle(&mut self, event: KeyEvent);
}

impl EventSink for Vec<KeyEvent> {
    fn handle(&mut self, event: KeyEvent) {
        self.push(event);
    }
}
