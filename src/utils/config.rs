//! Configuration and constants for the CLI.

/// Current JSON report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Separator used to split keys into path segments
pub const DEFAULT_DELIMITER: &str = ":";

/// Literal children kept per node before keys fall back to the wildcard branch
pub const DEFAULT_MAX_CHILDREN: usize = 10;

/// Upper bound accepted on the command line for `--max-children`
pub const MAX_REASONABLE_CHILDREN: usize = 100_000;

/// Segment label of the per-level catch-all node
pub const WILDCARD_SEGMENT: &str = "*";

/// Display label for the root node, whose path is empty
pub const ROOT_LABEL: &str = "ROOT";

// RDB dump versions we know how to read. Newer dumps are attempted with a warning.
pub const MIN_RDB_VERSION: u32 = 1;
pub const MAX_RDB_VERSION: u32 = 12;

/// Tree shape configuration.
///
/// Both values are fixed for the lifetime of a tree so that ingestion and
/// reporting always agree on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    pub delimiter: String,
    pub max_children: usize,
    /// Split keys into at most this many segments (`None` = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            max_children: DEFAULT_MAX_CHILDREN,
            max_depth: None,
        }
    }
}

impl TreeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}
