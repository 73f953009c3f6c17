//! Aggregation of key events into a bounded prefix tree and its reports.
//!
//! This module transforms key events into:
//! - The key tree itself (counts and bytes per prefix)
//! - Report rows (one per terminal or wildcard node)
//! - Collapsed stack format (for flamegraph generation)
//! - Top prefixes and tree shape statistics

pub mod metrics;
pub mod report;
pub mod stack_builder;
pub mod tree;

// Re-export main types and functions
pub use metrics::{calculate_top_prefixes, calculate_tree_stats, TreeStats};
pub use report::{build_report, to_report};
pub use stack_builder::{build_collapsed_stacks, CollapsedStack};
pub use tree::{tokenize, KeyTree, NodeKind, TreeNode};
