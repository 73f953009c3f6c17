//! JSON report output writer.
//!
//! Writes KeyReport structs to JSON files with proper formatting.

use crate::parser::schema::KeyReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report data to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let report = to_report(&tree, "dump.rdb", 20);
/// write_report(&report, "report.json")?;
/// ```
pub fn write_report(report: &KeyReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());

    super::validate_path(output_path)?;
    super::ensure_parent_dir(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, report).map_err(OutputError::SerializationFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    info!(
        "Report written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Calculate file size in bytes
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read a report from a JSON file
///
/// **Public** - used by the validate command and tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<KeyReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;

    let report: KeyReport =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Report loaded: version {}, {} rows",
        report.version,
        report.rows.len()
    );

    Ok(report)
}
