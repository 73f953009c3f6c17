//! JSON-lines event reader.
//!
//! One event per line, e.g.
//!
//! ```text
//! {"event":"observed","key":"app:users:1"}
//! {"event":"grew","key":"app:users:1","bytes":50}
//! ```
//!
//! Blank lines are ignored.

use super::events::{EventSink, KeyEvent};
use crate::utils::error::ParseError;
use log::debug;
use std::io::BufRead;

/// Read every event from `reader` into `sink`
///
/// **Public** - entry point for the `jsonl` input format
///
/// # Returns
/// Number of events delivered
///
/// # Errors
/// * `ParseError::Io` - the reader failed
/// * `ParseError::InvalidLine` - a line is not a valid event (1-based line number)
pub fn read_events<R, S>(reader: R, sink: &mut S) -> Result<u64, ParseError>
where
    R: BufRead,
    S: EventSink + ?Sized,
{
    let mut delivered = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: KeyEvent = serde_json::from_str(trimmed).map_err(|source| {
            ParseError::InvalidLine {
                line: index + 1,
                source,
            }
        })?;

        sink.handle(event);
        delivered += 1;
    }

    debug!("Read {} events from JSON lines", delivered);
    Ok(delivered)
}
