//! Keytree Audit
//!
//! Key-space usage auditing for Redis dumps. Keys are split on a delimiter
//! (`:` by default) and folded into a prefix tree that records, for every
//! prefix, how many keys share it and how many payload bytes they hold.
//!
//! Each tree level keeps a bounded number of literal children. Keys beyond
//! that capacity still count towards a per-level wildcard (`*`) branch, so
//! memory stays bounded no matter how many distinct keys a dump holds.
//!
//! ## Getting Started
//!
//! ```bash
//! keytree analyze --input dump.rdb --summary
//! ```
//!
//! As a library:
//!
//! ```
//! use keytree_audit::aggregator::{build_report, KeyTree};
//!
//! let mut tree = KeyTree::default();
//! tree.record_key("app:users:1");
//! tree.record_size("app:users:1", 50);
//!
//! let rows = build_report(&tree);
//! assert!(rows.iter().any(|row| row.path == "app:users:1" && row.size == 50));
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod output;
pub mod parser;
pub mod utils;
