//! Plain-text report table.
//!
//! ```text
//! count                size                 key
//! 2                    80                   app:users:*
//! ```

use crate::parser::schema::ReportRow;
use crate::utils::config::ROOT_LABEL;
use crate::utils::error::OutputError;
use std::io::Write;

/// Write the header and one line per row to `writer`
///
/// **Public** - default report output of the CLI
///
/// Count and size are left-justified in 20-character columns; the path is
/// written as-is, with the root shown as `ROOT`.
pub fn write_table<W: Write>(rows: &[ReportRow], writer: &mut W) -> Result<(), OutputError> {
    writeln!(writer, "{:<20} {:<20} key", "count", "size")?;

    for row in rows {
        let path = if row.path.is_empty() {
            ROOT_LABEL
        } else {
            row.path.as_str()
        };
        writeln!(writer, "{:<20} {:<20} {}", row.count, row.size, path)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_table_layout() {
        let rows = vec![
            ReportRow {
                count: 0,
                size: 0,
                path: String::new(),
            },
            ReportRow {
                count: 2,
                size: 80,
                path: "app:users:*".to_string(),
            },
        ];
        let mut out = Vec::new();

        write_table(&rows, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("{:<20} {:<20} key", "count", "size"));
        assert_eq!(lines[1], format!("{:<20} {:<20} ROOT", 0, 0));
        assert_eq!(lines[2], format!("{:<20} {:<20} app:users:*", 2, 80));
    }
}
