//! Keytree Audit CLI
//!
//! Summarises a Redis key space by prefix: key counts and payload bytes per
//! level of the key hierarchy.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use keytree_audit::commands::{
    display_version, execute_analyze, validate_args, validate_report_file, AnalyzeArgs,
    InputFormat,
};
use keytree_audit::flamegraph::FlamegraphConfig;
use keytree_audit::utils::config::{TreeConfig, DEFAULT_DELIMITER, DEFAULT_MAX_CHILDREN};

/// Keytree Audit - key-space usage by prefix
#[derive(Parser, Debug)]
#[command(name = "keytree")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate a dump or event stream and print the prefix table
    Analyze {
        /// Input file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Input format
        #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
        format: InputFormat,

        /// Key segment delimiter
        #[arg(short, long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,

        /// Literal children kept per tree level before falling back to `*`
        #[arg(long, default_value_t = DEFAULT_MAX_CHILDREN, env = "KEYTREE_MAX_CHILDREN")]
        max_children: usize,

        /// Split keys into at most this many segments
        #[arg(long)]
        max_depth: Option<usize>,

        /// Output path for JSON report (optional)
        #[arg(short, long)]
        json: Option<PathBuf>,

        /// Output path for SVG flamegraph (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value = "1200")]
        width: usize,

        /// Number of largest prefixes to rank
        #[arg(long, default_value = "20")]
        top: usize,

        /// Print ranked prefix summary after the table
        #[arg(long)]
        summary: bool,

        /// Do not print the count/size/key table
        #[arg(long)]
        no_table: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging (stderr, so the table on stdout stays clean)
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            input,
            format,
            delimiter,
            max_children,
            max_depth,
            json,
            flamegraph,
            title,
            width,
            top,
            summary,
            no_table,
        } => {
            let fg_config = if flamegraph.is_some() {
                let mut config = FlamegraphConfig::new().with_width(width);

                if let Some(title_str) = title {
                    config = config.with_title(title_str);
                }

                Some(config)
            } else {
                None
            };

            let args = AnalyzeArgs {
                input,
                format,
                tree: TreeConfig::new()
                    .with_delimiter(delimiter)
                    .with_max_children(max_children)
                    .with_max_depth(max_depth),
                output_json: json,
                output_svg: flamegraph,
                flamegraph_config: fg_config,
                top_prefixes: top,
                print_summary: summary,
                print_table: !no_table,
            };

            // Validate args first
            validate_args(&args)?;

            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            execute_analyze(args, &mut out)?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
