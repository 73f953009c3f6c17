//! Output writers for key-space reports and flamegraphs.
//!
//! This module handles writing data in various formats:
//! - Plain-text table (count, size, key) to any writer
//! - JSON reports
//! - SVG flamegraphs

pub mod json;
pub mod svg;
pub mod text;

// Re-export main functions
pub use json::{read_report, write_report};
pub use svg::write_svg;
pub use text::write_table;

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

/// Common path validation for output files
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Create missing parent directories of an output file
fn ensure_parent_dir(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}
