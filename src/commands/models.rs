use crate::flamegraph::FlamegraphConfig;
use crate::utils::config::TreeConfig;
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Input event format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InputFormat {
    /// Pick from the file extension, RDB otherwise
    #[default]
    Auto,
    /// Redis RDB dump
    Rdb,
    /// One JSON event per line
    Jsonl,
}

impl InputFormat {
    /// Resolve `Auto` against the input path
    ///
    /// `.jsonl`, `.ndjson` and `.json` files are read as JSON lines; anything
    /// else, stdin included, as an RDB dump.
    pub fn resolve(self, input: Option<&Path>) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let is_json = input
                    .and_then(|path| path.extension())
                    .and_then(|ext| ext.to_str())
                    .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "jsonl" | "ndjson" | "json"))
                    .unwrap_or(false);
                if is_json {
                    InputFormat::Jsonl
                } else {
                    InputFormat::Rdb
                }
            }
            explicit => explicit,
        }
    }
}

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Input file (None = stdin)
    pub input: Option<PathBuf>,

    /// Input event format
    pub format: InputFormat,

    /// Delimiter, fan-out and depth of the key tree
    pub tree: TreeConfig,

    /// Output path for JSON report (optional)
    pub output_json: Option<PathBuf>,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Number of largest prefixes to rank
    pub top_prefixes: usize,

    /// Print the ranked prefix summary after the table
    pub print_summary: bool,

    /// Print the count/size/key table
    pub print_table: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: None,
            format: InputFormat::Auto,
            tree: TreeConfig::default(),
            output_json: None,
            output_svg: None,
            flamegraph_config: None,
            top_prefixes: 20,
            print_summary: false,
            print_table: true,
        }
    }
}
