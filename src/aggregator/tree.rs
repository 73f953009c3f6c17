//! Bounded-fanout aggregation tree over delimited keys.
//!
//! Every key is split into segments and walked from the root. Each node keeps
//! the number of keys that passed through it and the bytes attributed to them.
//!
//! A node retains at most `max_children` literal children. Besides those, the
//! first key that continues below a node creates a wildcard child which from
//! then on receives every key passing that level, so overflowed keys are never
//! lost from the aggregates, only from the literal detail.
//!
//! Example with `max_children = 2` after observing `a:1`, `a:2`, `a:3`:
//!
//! ```text
//! ROOT (3)
//! ├── * (3)
//! │   └── ...
//! └── a (3)
//!     ├── * (3)
//!     ├── 1 (1)
//!     └── 2 (1)        `3` was dropped from the literal branch
//! ```

use crate::parser::events::{EventSink, KeyEvent};
use crate::utils::config::{TreeConfig, WILDCARD_SEGMENT};
use log::debug;
use std::collections::BTreeMap;

/// What a node stands for in its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Literal,
    Wildcard,
}

/// A single node of the key tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    kind: NodeKind,
    segment: String,
    // BTreeMap keeps literal children in lexicographic order for reporting
    children: BTreeMap<String, TreeNode>,
    wildcard: Option<Box<TreeNode>>,
    count: u64,
    size: u64,
}

impl TreeNode {
    fn new(kind: NodeKind, segment: impl Into<String>) -> Self {
        Self {
            kind,
            segment: segment.into(),
            children: BTreeMap::new(),
            wildcard: None,
            count: 0,
            size: 0,
        }
    }

    fn root() -> Self {
        Self::new(NodeKind::Root, "")
    }

    fn wildcard_node() -> Self {
        Self::new(NodeKind::Wildcard, WILDCARD_SEGMENT)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Literal token, `*` for wildcard nodes, empty for the root
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Number of keys whose path passed through this node
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bytes attributed to keys passing through this node
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == NodeKind::Wildcard
    }

    pub fn wildcard(&self) -> Option<&TreeNode> {
        self.wildcard.as_deref()
    }

    pub fn child(&self, segment: &str) -> Option<&TreeNode> {
        self.children.get(segment)
    }

    /// Literal children in lexicographic order of their segment
    pub fn children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children.values()
    }

    pub fn literal_count(&self) -> usize {
        self.children.len()
    }

    fn record_key(&mut self, segments: &[&str], max_children: usize) {
        self.count += 1;

        let Some((head, tail)) = segments.split_first() else {
            return;
        };

        self.wildcard
            .get_or_insert_with(|| Box::new(TreeNode::wildcard_node()))
            .record_key(tail, max_children);

        if let Some(child) = self.children.get_mut(*head) {
            child.record_key(tail, max_children);
        } else if self.children.len() < max_children {
            let mut child = TreeNode::new(NodeKind::Literal, *head);
            child.record_key(tail, max_children);
            self.children.insert((*head).to_string(), child);
        }
        // At capacity: the literal branch stops here, the wildcard already has the key
    }

    fn record_size(&mut self, segments: &[&str], bytes: u64) {
        self.size = self.size.saturating_add(bytes);

        let Some((head, tail)) = segments.split_first() else {
            return;
        };

        if let Some(wildcard) = self.wildcard.as_mut() {
            wildcard.record_size(tail, bytes);
        }
        if let Some(child) = self.children.get_mut(*head) {
            child.record_size(tail, bytes);
        }
    }

    /// Depth-first pre-order walk: the node, then its wildcard subtree, then
    /// literal children in lexicographic order.
    ///
    /// `visit` receives the segments from the root down to the node (empty for
    /// the root itself).
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&[&'a str], &'a TreeNode),
    {
        let mut path = Vec::new();
        self.walk_from(&mut path, visit);
    }

    fn walk_from<'a, F>(&'a self, path: &mut Vec<&'a str>, visit: &mut F)
    where
        F: FnMut(&[&'a str], &'a TreeNode),
    {
        visit(path, self);

        if let Some(wildcard) = self.wildcard() {
            path.push(wildcard.segment());
            wildcard.walk_from(path, visit);
            path.pop();
        }

        for child in self.children() {
            path.push(child.segment());
            child.walk_from(path, visit);
            path.pop();
        }
    }
}

/// Split a key into path segments.
///
/// An empty key has no segments. Empty segments are kept as literal tokens,
/// so `a::b` yields `["a", "", "b"]`. With `max_depth` set, the last segment
/// keeps the unsplit remainder of the key.
pub fn tokenize<'a>(key: &'a str, delimiter: &str, max_depth: Option<usize>) -> Vec<&'a str> {
    if key.is_empty() {
        return Vec::new();
    }
    if delimiter.is_empty() {
        return vec![key];
    }

    match max_depth {
        Some(depth) if depth > 0 => key.splitn(depth, delimiter).collect(),
        _ => key.split(delimiter).collect(),
    }
}

/// Aggregation tree built from a single pass over key events
///
/// **Public** - main entry point for ingestion
#[derive(Debug, Clone)]
pub struct KeyTree {
    config: TreeConfig,
    root: TreeNode,
}

impl Default for KeyTree {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl KeyTree {
    pub fn new(config: TreeConfig) -> Self {
        debug!(
            "Creating key tree (delimiter {:?}, max {} children per node)",
            config.delimiter, config.max_children
        );
        Self {
            config,
            root: TreeNode::root(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Number of keys observed so far
    pub fn total_keys(&self) -> u64 {
        self.root.count
    }

    /// Bytes attributed so far
    pub fn total_bytes(&self) -> u64 {
        self.root.size
    }

    /// Count one key along its path, creating nodes as capacity allows
    pub fn record_key(&mut self, key: &str) {
        let segments = tokenize(key, &self.config.delimiter, self.config.max_depth);
        self.root.record_key(&segments, self.config.max_children);
    }

    /// Add `bytes` to every existing node on the key's path.
    ///
    /// Never creates nodes. A key whose literal path was truncated still
    /// credits the surviving literal prefix and the wildcard branches.
    pub fn record_size(&mut self, key: &str, bytes: u64) {
        let segments = tokenize(key, &self.config.delimiter, self.config.max_depth);
        self.root.record_size(&segments, bytes);
    }

    /// Look up a node by its delimited path.
    ///
    /// The path is split the same way keys are, `max_depth` included, so a
    /// full key finds its own node. `*` segments resolve to wildcard children
    /// and the empty path to the root. A literal `*` token is therefore not
    /// addressable here.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut node = &self.root;
        for segment in tokenize(path, &self.config.delimiter, self.config.max_depth) {
            node = if segment == WILDCARD_SEGMENT {
                node.wildcard()?
            } else {
                node.child(segment)?
            };
        }
        Some(node)
    }
}

impl EventSink for KeyTree {
    fn handle(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Observed { key } => self.record_key(&key),
            KeyEvent::Grew { key, bytes } => self.record_size(&key, bytes),
        }
    }
}
