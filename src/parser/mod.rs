//! Event sources and report schema.
//!
//! This module handles:
//! - The key event model and the sink trait the tree implements
//! - Decoding Redis RDB dumps into events
//! - Reading events from JSON lines
//! - Defining the output schema

pub mod encodings;
pub mod events;
pub mod jsonl;
pub mod rdb;
pub mod schema;

// Re-export main types
pub use events::{EventSink, KeyEvent};
pub use jsonl::read_events;
pub use rdb::{decode, DecodeSummary};
pub use schema::{KeyReport, ReportRow, TopPrefix};
