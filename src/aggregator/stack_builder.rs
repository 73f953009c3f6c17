//! Build collapsed stack format from the key tree.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "parent;child;grandchild weight"
//!
//! Example: "app;users;42 1000"
//! This means: 1000 bytes sit under `app:users:42` and not under any
//! retained child of it.

use super::tree::{KeyTree, TreeNode};
use crate::utils::config::WILDCARD_SEGMENT;
use log::debug;

/// A single collapsed stack entry
///
/// **Public** - used by flamegraph generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Key path as semicolon-separated frames
    pub stack: String,

    /// Weight (bytes attributed to this exact frame)
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Render as one line of collapsed-stack input
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Build collapsed stacks from the literal branches of the tree
///
/// **Public** - main entry point for stack building
///
/// Wildcard subtrees are skipped since they repeat bytes already present on
/// the literal side. A node's weight is its size minus its literal children's
/// sizes, so bytes of truncated keys stay on the deepest retained ancestor.
/// At the root such bytes land on a `*` frame.
///
/// # Returns
/// Stacks with non-zero weight, sorted by weight (descending)
pub fn build_collapsed_stacks(tree: &KeyTree) -> Vec<CollapsedStack> {
    let mut stacks = Vec::new();
    let mut frames = Vec::new();
    collect_stacks(tree.root(), &mut frames, &mut stacks);

    stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));

    debug!("Built {} collapsed stacks", stacks.len());
    stacks
}

fn collect_stacks(node: &TreeNode, frames: &mut Vec<String>, out: &mut Vec<CollapsedStack>) {
    let children_size: u64 = node.children().map(TreeNode::size).sum();
    let own = node.size().saturating_sub(children_size);

    if own > 0 {
        let stack = if frames.is_empty() {
            WILDCARD_SEGMENT.to_string()
        } else {
            frames.join(";")
        };
        out.push(CollapsedStack::new(stack, own));
    }

    for child in node.children() {
        frames.push(frame_name(child.segment()));
        collect_stacks(child, frames, out);
        frames.pop();
    }
}

/// Make a segment safe to use as a single frame
fn frame_name(segment: &str) -> String {
    if segment.is_empty() {
        return "(empty)".to_string();
    }
    segment.replace(';', ",").replace(char::is_whitespace, "_")
}
