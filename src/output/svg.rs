//! SVG flamegraph output writer.

use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write SVG content to a file
///
/// **Public** - main entry point for SVG output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is invalid
pub fn write_svg(svg_content: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing SVG to: {}", output_path.display());

    super::validate_path(output_path)?;
    if output_path.extension().map_or(true, |ext| ext != "svg") {
        debug!("File does not have .svg extension: {}", output_path.display());
    }
    super::ensure_parent_dir(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    writer
        .write_all(svg_content.as_bytes())
        .map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    let file_size = svg_content.len();
    info!(
        "SVG written successfully ({} bytes, {:.2} KB)",
        file_size,
        file_size as f64 / 1024.0
    );

    Ok(())
}
