//! Output JSON schema definitions for key-space reports.
//!
//! This module defines the structure of JSON files we write to disk.
//! Schema is versioned to allow future evolution.

use crate::aggregator::metrics::TreeStats;
use serde::{Deserialize, Serialize};

/// Top-level report structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Where the events came from (file path or `-` for stdin)
    pub source: String,

    /// Delimiter the keys were split on
    pub delimiter: String,

    /// Literal children retained per node
    pub max_children: usize,

    /// Number of keys observed
    pub total_keys: u64,

    /// Payload bytes attributed to all keys
    pub total_bytes: u64,

    /// Shape of the aggregation tree
    pub stats: TreeStats,

    /// Largest prefixes by size
    pub top_prefixes: Vec<TopPrefix>,

    /// One row per reported node, in traversal order
    pub rows: Vec<ReportRow>,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

/// One reported tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Keys that passed through the node
    pub count: u64,

    /// Bytes attributed to those keys
    pub size: u64,

    /// Delimited path from the root, `*` for wildcard levels, empty for the root
    pub path: String,
}

/// A report row ranked by size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopPrefix {
    pub path: String,
    pub count: u64,
    pub size: u64,

    /// Percentage of total bytes
    pub percentage: f64,
}
