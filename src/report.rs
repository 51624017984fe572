//! Writing the combined bin summaries for downstream charting.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::CombinedResult;

/// Output format for the combined result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values with a header row (default)
    #[default]
    Csv,
    /// Pretty-printed JSON array of rows
    Json,
    /// A single Markdown table
    Markdown,
}

/// Render `result` in the requested format.
pub fn render(result: &CombinedResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Csv => render_csv(result),
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("serializing result to JSON")
        }
        OutputFormat::Markdown => Ok(render_markdown(result)),
    }
}

/// CSV with columns `sample,bin_edge,count,mean,standard_error`.
/// An undefined standard error is written as an empty cell.
fn render_csv(result: &CombinedResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if result.is_empty() {
        writer
            .write_record(["sample", "bin_edge", "count", "mean", "standard_error"])
            .context("writing CSV header")?;
    }
    for row in &result.rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    let bytes = writer.into_inner().context("flushing CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn render_markdown(result: &CombinedResult) -> String {
    let mut output = String::new();

    output.push_str("| Sample | Bin edge | Count | Mean | Std. error |\n");
    output.push_str("|---|---:|---:|---:|---:|\n");
    for row in &result.rows {
        let se = row
            .standard_error
            .map(|se| format!("{se:.4}"))
            .unwrap_or_else(|| "–".to_string());
        output.push_str(&format!(
            "| {} | {:.4} | {} | {:.4} | {} |\n",
            row.sample, row.bin_edge, row.count, row.mean, se
        ));
    }

    output
}

/// Write `content` to `path`, or to stdout when no path is given.
pub fn write_output(content: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write result to {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .context("writing result to stdout")?;
            stdout.flush().context("flushing stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::BinSummary;

    fn sample_result() -> CombinedResult {
        let mut result = CombinedResult::default();
        result.extend_from_sample(
            "control",
            &[
                BinSummary {
                    bin_edge: 0.5,
                    count: 2,
                    mean: 2.0,
                    standard_error: Some(1.0),
                },
                BinSummary {
                    bin_edge: 1.0,
                    count: 1,
                    mean: 6.0,
                    standard_error: None,
                },
            ],
        );
        result
    }

    #[test]
    fn test_csv_has_header_and_empty_standard_error() {
        let csv = render(&sample_result(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "sample,bin_edge,count,mean,standard_error");
        assert_eq!(lines[1], "control,0.5,2,2.0,1.0");
        assert_eq!(lines[2], "control,1.0,1,6.0,");
    }

    #[test]
    fn test_csv_of_empty_result_still_has_header() {
        let csv = render(&CombinedResult::default(), OutputFormat::Csv).unwrap();
        assert_eq!(csv.trim_end(), "sample,bin_edge,count,mean,standard_error");
    }

    #[test]
    fn test_json_uses_null_for_undefined_standard_error() {
        let json = render(&sample_result(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["sample"], "control");
        assert_eq!(rows[0]["standard_error"], 1.0);
        assert!(rows[1]["standard_error"].is_null());
    }

    #[test]
    fn test_markdown_table() {
        let md = render(&sample_result(), OutputFormat::Markdown).unwrap();
        assert!(md.starts_with("| Sample | Bin edge |"));
        assert!(md.contains("| control | 0.5000 | 2 | 2.0000 | 1.0000 |"));
        assert!(md.contains("| control | 1.0000 | 1 | 6.0000 | – |"));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_output("a,b\n", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
