//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Opens the input (file or stdin)
//! 2. Streams key events into the key tree
//! 3. Builds report rows and tree statistics
//! 4. Ranks the largest prefixes
//! 5. Generates flamegraph
//! 6. Writes output files

use crate::aggregator::report::to_report;
use crate::aggregator::{build_collapsed_stacks, KeyTree};
use crate::commands::models::{AnalyzeArgs, InputFormat};
use crate::flamegraph::{generate_flamegraph, generate_text_summary};
use crate::output::{write_report, write_svg, write_table};
use crate::parser::{decode, read_events, KeyReport};
use crate::utils::config::MAX_REASONABLE_CHILDREN;
use crate::utils::error::FlamegraphError;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Analyze command arguments
/// * `out` - Where the text table (and summary) go, normally stdout
///
/// # Returns
/// The finished report, also written to `args.output_json` when set
///
/// # Errors
/// * Input open/decode failures
/// * File write errors
pub fn execute_analyze<W: Write>(args: AnalyzeArgs, out: &mut W) -> Result<KeyReport> {
    let start_time = Instant::now();
    let format = args.format.resolve(args.input.as_deref());
    let source = args
        .input
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    info!("Starting analysis of {} ({:?})", source, format);

    // Step 1: Open input
    info!("Step 1/6: Opening input...");
    let reader = open_input(args.input.as_deref())?;

    // Step 2: Ingest
    info!("Step 2/6: Building key tree...");
    let mut tree = KeyTree::new(args.tree.clone());
    let observed = ingest(reader, format, &mut tree)
        .with_context(|| format!("Failed to read events from {}", source))?;

    debug!(
        "Ingested {} keys, {} bytes",
        observed,
        tree.total_bytes()
    );

    // Steps 3 and 4: Report rows, statistics, top prefixes
    info!("Step 3/6: Building report rows...");
    info!("Step 4/6: Ranking top {} prefixes...", args.top_prefixes);
    let report = to_report(&tree, &source, args.top_prefixes);
    info!("Tree shape: {}", report.stats.summary());

    // Step 5: Generate flamegraph (if requested)
    let svg_content = if args.output_svg.is_some() {
        info!("Step 5/6: Generating flamegraph...");
        let stacks = build_collapsed_stacks(&tree);
        match generate_flamegraph(&stacks, args.flamegraph_config.as_ref()) {
            Ok(svg) => Some(svg),
            Err(FlamegraphError::EmptyStacks) => {
                warn!("No bytes attributed to any key, skipping flamegraph");
                None
            }
            Err(e) => return Err(e).context("Failed to generate flamegraph"),
        }
    } else {
        info!("Step 5/6: Skipping flamegraph generation (not requested)");
        None
    };

    // Step 6: Write outputs
    info!("Step 6/6: Writing outputs...");

    if args.print_table {
        write_table(&report.rows, out).context("Failed to write report table")?;
    }

    if let Some(json_path) = &args.output_json {
        write_report(&report, json_path).context("Failed to write report JSON")?;
        info!("✓ Report written to: {}", json_path.display());
    }

    if let (Some(svg), Some(svg_path)) = (svg_content, &args.output_svg) {
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }

    if args.print_summary {
        writeln!(out, "\n{}", "=".repeat(88))?;
        writeln!(out, "KEY SPACE SUMMARY")?;
        writeln!(out, "{}", "=".repeat(88))?;
        writeln!(out, "Source:     {}", report.source)?;
        writeln!(out, "Total Keys: {}", report.total_keys)?;
        writeln!(out, "Total Bytes: {}", report.total_bytes)?;
        writeln!(out, "Tree:       {}", report.stats.summary())?;
        if report.stats.is_truncated() {
            writeln!(
                out,
                "Note: some levels exceeded {} distinct segments; see the `*` rows",
                report.max_children
            )?;
        }
        writeln!(out, "\n{}", generate_text_summary(&report.top_prefixes, report.total_bytes))?;
        writeln!(out, "{}", "=".repeat(88))?;
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Stream every event from `reader` into `tree`
///
/// **Public** - usable without the rest of the analyze pipeline
///
/// # Returns
/// Keys observed while reading `reader`, whatever the format
pub fn ingest<R: BufRead>(reader: R, format: InputFormat, tree: &mut KeyTree) -> Result<u64> {
    let keys_before = tree.total_keys();

    match format.resolve(None) {
        InputFormat::Jsonl => {
            let events = read_events(reader, tree).context("Invalid JSON-lines input")?;
            debug!("Read {} events", events);
        }
        _ => {
            let summary = decode(reader, tree).context("Invalid RDB dump")?;
            debug!("RDB summary: {:?}", summary);
        }
    }

    Ok(tree.total_keys() - keys_before)
}

/// Open the input file, or stdin when none is given
fn open_input(input: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(std::io::stdin().lock())),
    }
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.tree.delimiter.is_empty() {
        anyhow::bail!("Delimiter cannot be empty");
    }

    if args.tree.max_children == 0 {
        anyhow::bail!("max_children must be greater than 0");
    }

    if args.tree.max_children > MAX_REASONABLE_CHILDREN {
        anyhow::bail!(
            "max_children is too large (max {})",
            MAX_REASONABLE_CHILDREN
        );
    }

    if args.tree.max_depth == Some(0) {
        anyhow::bail!("max_depth must be greater than 0");
    }

    if args.top_prefixes == 0 {
        anyhow::bail!("top_prefixes must be greater than 0");
    }

    if args.top_prefixes > 1000 {
        anyhow::bail!("top_prefixes is too large (max 1000)");
    }

    if let Some(input) = &args.input {
        if !input.is_file() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
    }

    Ok(())
}
