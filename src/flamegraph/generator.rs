//! SVG flamegraph generation using the inferno library.
//!
//! Frames are key segments and widths are bytes, so the widest towers are the
//! key prefixes holding the most payload.

use crate::aggregator::stack_builder::CollapsedStack;
use crate::parser::schema::TopPrefix;
use crate::utils::config::ROOT_LABEL;
use crate::utils::error::FlamegraphError;
use inferno::flamegraph::{self, Options};
use log::info;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Key Space Usage".to_string(),
            width: 1200,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// Generate SVG flamegraph from collapsed stacks
///
/// **Public** - main entry point for flamegraph rendering
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - Nothing to draw (no bytes attributed)
/// * `FlamegraphError::Render` - inferno failed to render
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.is_empty() {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    let lines: Vec<String> = stacks.iter().map(CollapsedStack::to_line).collect();

    let mut options = Options::default();
    options.title = config.title;
    options.count_name = "bytes".to_string();
    options.image_width = Some(config.width);

    let mut svg = Vec::new();
    flamegraph::from_lines(&mut options, lines.iter().map(String::as_str), &mut svg)
        .map_err(|e| FlamegraphError::Render(e.to_string()))?;

    let svg = String::from_utf8(svg)?;
    info!("Flamegraph generated successfully ({} bytes)", svg.len());
    Ok(svg)
}

/// Create a text summary of the largest prefixes with percentages
pub fn generate_text_summary(prefixes: &[TopPrefix], total_bytes: u64) -> String {
    let mut lines = Vec::new();

    lines.push("  LARGEST KEY PREFIXES".to_string());
    lines.push(format!("  {}", "-".repeat(86)));
    lines.push(format!(
        "  {:<44} {:>14} {:>16} {:>7}",
        "Prefix (largest first)", "KEYS", "BYTES", "%"
    ));
    lines.push(format!("  {}", "-".repeat(86)));

    for prefix in prefixes {
        let display_path = if prefix.path.is_empty() {
            ROOT_LABEL.to_string()
        } else if prefix.path.chars().count() > 44 {
            let tail: String = {
                let chars: Vec<char> = prefix.path.chars().collect();
                chars[chars.len() - 41..].iter().collect()
            };
            format!("...{}", tail)
        } else {
            prefix.path.clone()
        };

        lines.push(format!(
            "  {:<44} {:>14} {:>16} {:>6.1}%",
            display_path, prefix.count, prefix.size, prefix.percentage
        ));
    }

    lines.push(format!("  {}", "-".repeat(86)));
    lines.push(format!("  Total bytes: {}", total_bytes));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stacks_rejected() {
        assert!(matches!(
            generate_flamegraph(&[], None),
            Err(FlamegraphError::EmptyStacks)
        ));
    }

    #[test]
    fn test_generate_flamegraph_svg() {
        let stacks = vec![
            CollapsedStack::new("app;users".to_string(), 80),
            CollapsedStack::new("cache".to_string(), 20),
        ];
        let config = FlamegraphConfig::new().with_title("Test Dump");

        let svg = generate_flamegraph(&stacks, Some(&config)).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Test Dump"));
        assert!(svg.contains("users"));
    }

    #[test]
    fn test_render_error_message() {
        let err = FlamegraphError::Render("bad frame".to_string());
        assert_eq!(err.to_string(), "Failed to render flamegraph: bad frame");
    }

    #[test]
    fn test_text_summary_truncates_long_paths() {
        let prefixes = vec![TopPrefix {
            path: "x".repeat(60),
            count: 1,
            size: 10,
            percentage: 100.0,
        }];

        let summary = generate_text_summary(&prefixes, 10);

        assert!(summary.contains(&format!("...{}", "x".repeat(41))));
        assert!(!summary.contains(&"x".repeat(45)));
        assert!(summary.contains("Total bytes: 10"));
    }
}
