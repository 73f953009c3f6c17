//! Reporting traversal over the key tree.
//!
//! A node is reported when it has no wildcard child (nothing continued below
//! it) or when it is itself a wildcard node. Inner literal nodes are summarised
//! by their wildcard child instead.

use super::metrics::{calculate_top_prefixes, calculate_tree_stats};
use super::tree::{KeyTree, TreeNode};
use crate::parser::schema::{KeyReport, ReportRow};
use crate::utils::config::SCHEMA_VERSION;
use chrono::Utc;
use log::debug;

/// Whether a node gets its own report row
pub fn is_reported(node: &TreeNode) -> bool {
    node.wildcard().is_none() || node.is_wildcard()
}

/// Build the report rows for a finished tree
///
/// **Public** - main entry point for reporting
///
/// Rows come out depth-first: a node, then its wildcard subtree, then literal
/// children in lexicographic order. The same tree always yields the same rows.
pub fn build_report(tree: &KeyTree) -> Vec<ReportRow> {
    let delimiter = tree.config().delimiter.as_str();
    let mut rows = Vec::new();

    tree.root().walk(&mut |path, node| {
        if is_reported(node) {
            rows.push(ReportRow {
                count: node.count(),
                size: node.size(),
                path: path.join(delimiter),
            });
        }
    });

    debug!("Built {} report rows", rows.len());
    rows
}

/// Convert a finished tree into the output report format
///
/// **Public** - used by commands to create final output
pub fn to_report(tree: &KeyTree, source: &str, top_n: usize) -> KeyReport {
    let rows = build_report(tree);
    let top_prefixes = calculate_top_prefixes(tree, top_n);

    KeyReport {
        version: SCHEMA_VERSION.to_string(),
        source: source.to_string(),
        delimiter: tree.config().delimiter.clone(),
        max_children: tree.config().max_children,
        total_keys: tree.total_keys(),
        total_bytes: tree.total_bytes(),
        stats: calculate_tree_stats(tree),
        top_prefixes,
        rows,
        generated_at: Utc::now().to_rfc3339(),
    }
}
