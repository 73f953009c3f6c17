use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)
        .with_context(|| format!("Failed to read report {}", file_path.display()))?;

    if report.version != SCHEMA_VERSION {
        anyhow::bail!(
            "Report schema v{} does not match supported v{}",
            report.version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Source: {}", report.source);
    println!("  Total Keys: {}", report.total_keys);
    println!("  Total Bytes: {}", report.total_bytes);
    println!("  Rows: {}", report.rows.len());
    println!("  Top Prefixes: {}", report.top_prefixes.len());

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("Keytree Audit v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Key-space usage auditing for Redis dumps.");
}
