//! Summary metrics over a finished key tree.
//!
//! Top prefixes are the nodes that hold the most bytes, ranked among those
//! reached through literal segments only: `app:*` and `app:users:1` are
//! candidates, `*` and `*:users:*` are not.
//! These are the first places to look when auditing memory usage.

use super::report::is_reported;
use super::tree::{KeyTree, TreeNode};
use crate::parser::schema::{ReportRow, TopPrefix};
use log::debug;
use serde::{Deserialize, Serialize};

/// Rank the literal prefixes of `tree` by size and keep the top `top_n`
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `tree` - Finished key tree
/// * `top_n` - Number of prefixes to return
///
/// # Returns
/// Prefixes sorted by size (descending), ties broken by path
pub fn calculate_top_prefixes(tree: &KeyTree, top_n: usize) -> Vec<TopPrefix> {
    let mut candidates = Vec::new();
    let mut path = Vec::new();
    for child in tree.root().children() {
        collect_literal_rows(child, tree.config().delimiter.as_str(), &mut path, &mut candidates);
    }

    debug!(
        "Ranking top {} prefixes from {} literal rows",
        top_n,
        candidates.len()
    );

    candidates.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));

    candidates
        .iter()
        .take(top_n)
        .map(|row| create_top_prefix(row, tree.total_bytes()))
        .collect()
}

/// Rows below a literal node whose ancestors are all literal
///
/// A node with a wildcard child contributes that wildcard's row in its place.
fn collect_literal_rows<'a>(
    node: &'a TreeNode,
    delimiter: &str,
    path: &mut Vec<&'a str>,
    out: &mut Vec<ReportRow>,
) {
    path.push(node.segment());

    let reported = match node.wildcard() {
        Some(wildcard) => {
            path.push(wildcard.segment());
            let row = ReportRow {
                count: wildcard.count(),
                size: wildcard.size(),
                path: path.join(delimiter),
            };
            path.pop();
            row
        }
        None => ReportRow {
            count: node.count(),
            size: node.size(),
            path: path.join(delimiter),
        },
    };
    out.push(reported);

    for child in node.children() {
        collect_literal_rows(child, delimiter, path, out);
    }

    path.pop();
}

/// Create a TopPrefix from a ReportRow
pub fn create_top_prefix(row: &ReportRow, total_bytes: u64) -> TopPrefix {
    let percentage = if total_bytes > 0 {
        (row.size as f64 / total_bytes as f64) * 100.0
    } else {
        0.0
    };

    TopPrefix {
        path: row.path.clone(),
        count: row.count,
        size: row.size,
        percentage,
    }
}

/// Shape statistics of a key tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Nodes in the tree, root and wildcards included
    pub node_count: u64,

    /// Wildcard nodes
    pub wildcard_count: u64,

    /// Nodes whose literal children reached the configured capacity
    pub saturated_nodes: u64,

    /// Deepest level below the root
    pub max_depth: usize,

    /// Nodes that appear in the report
    pub row_count: u64,
}

impl TreeStats {
    /// Whether any level dropped literal detail
    pub fn is_truncated(&self) -> bool {
        self.saturated_nodes > 0
    }

    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Nodes: {} | Wildcards: {} | Saturated: {} | Depth: {} | Rows: {}",
            self.node_count, self.wildcard_count, self.saturated_nodes, self.max_depth, self.row_count
        )
    }
}

/// Walk the tree once and collect its shape statistics
///
/// **Public** - logged after ingestion and stored in the JSON report
pub fn calculate_tree_stats(tree: &KeyTree) -> TreeStats {
    let max_children = tree.config().max_children;
    let mut stats = TreeStats::default();

    tree.root().walk(&mut |path, node| {
        stats.node_count += 1;
        if node.is_wildcard() {
            stats.wildcard_count += 1;
        }
        if max_children > 0 && node.literal_count() >= max_children {
            stats.saturated_nodes += 1;
        }
        if is_reported(node) {
            stats.row_count += 1;
        }
        stats.max_depth = stats.max_depth.max(path.len());
    });

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::TreeConfig;

    fn row(path: &str, size: u64) -> ReportRow {
        ReportRow {
            count: 1,
            size,
            path: path.to_string(),
        }
    }

    fn sized_tree(items: &[(&str, u64)]) -> KeyTree {
        let mut tree = KeyTree::default();
        for (key, bytes) in items {
            tree.record_key(key);
            tree.record_size(key, *bytes);
        }
        tree
    }

    #[test]
    fn test_calculate_top_prefixes() {
        let tree = sized_tree(&[("app:users:1", 50), ("app:users:2", 30), ("cache:page", 20)]);

        let top = calculate_top_prefixes(&tree, 4);

        let paths: Vec<&str> = top.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["app:*", "app:users:*", "app:users:1", "app:users:2"]);
        assert_eq!(top[0].size, 80);
        assert_eq!(top[0].percentage, 80.0);
        assert_eq!(top[2].percentage, 50.0);
    }

    #[test]
    fn test_wildcard_rooted_rows_not_ranked() {
        let tree = sized_tree(&[("a:b:c", 10), ("d", 5)]);

        let top = calculate_top_prefixes(&tree, 100);

        assert!(top.iter().all(|p| !p.path.starts_with('*')));
        assert!(top.iter().all(|p| !p.path.is_empty()));
        assert_eq!(top[0].path, "a:*");
        assert!(top.iter().any(|p| p.path == "d"));
    }

    #[test]
    fn test_top_prefixes_tie_break_by_path() {
        let tree = sized_tree(&[("z", 10), ("a", 10)]);
        let top = calculate_top_prefixes(&tree, 2);
        assert_eq!(top[0].path, "a");
        assert_eq!(top[1].path, "z");
    }

    #[test]
    fn test_top_prefixes_empty_tree() {
        assert!(calculate_top_prefixes(&KeyTree::default(), 5).is_empty());
    }

    #[test]
    fn test_create_top_prefix_zero_total() {
        let prefix = create_top_prefix(&row("x", 0), 0);
        assert_eq!(prefix.percentage, 0.0);
    }

    #[test]
    fn test_tree_stats() {
        let mut tree = KeyTree::new(TreeConfig::new().with_max_children(2));
        for key in ["a:1", "a:2", "a:3"] {
            tree.record_key(key);
        }

        let stats = calculate_tree_stats(&tree);

        // root, *, *:*, *:1, *:2, a, a:*, a:1, a:2
        assert_eq!(stats.node_count, 9);
        assert_eq!(stats.wildcard_count, 3);
        // `*` and `a` each hold two literal children
        assert_eq!(stats.saturated_nodes, 2);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.row_count, 7);
        assert!(stats.is_truncated());
    }

    #[test]
    fn test_tree_stats_empty() {
        let stats = calculate_tree_stats(&KeyTree::default());
        assert_eq!(stats.node_count, 1);
        assert_eq!(stats.row_count, 1);
        assert!(!stats.is_truncated());
    }
}
