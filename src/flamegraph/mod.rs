//! Flamegraph generation using the inferno library.
//!
//! This module converts collapsed key stacks into interactive SVG flamegraphs
//! and renders the plain-text prefix summary.

pub mod generator;

// Re-export main types
pub use generator::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
