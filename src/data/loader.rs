use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{RawRow, RawSample};

/// Which two columns of the input table hold the primary and secondary
/// fluorescence channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSelection {
    #[serde(default = "default_primary")]
    pub primary: String,
    #[serde(default = "default_secondary")]
    pub secondary: String,
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
        }
    }
}

fn default_primary() -> String {
    "FITC-A".to_string()
}

fn default_secondary() -> String {
    "PE-A".to_string()
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one sample from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one cell per row, channel columns by name
/// * `.json`    – `[{ "FITC-A": 812.0, "PE-A": 95.5, ... }, ...]`
/// * `.parquet` – numeric (float or integer) channel columns
///
/// The sample is labelled with `label`, or the file stem when `None`.
/// Unparseable or missing readings load as `None`; cleaning removes them.
pub fn load_sample(path: &Path, channels: &ChannelSelection, label: Option<&str>) -> Result<RawSample> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => load_csv(path, channels),
        "json" => load_json(path, channels),
        "parquet" | "pq" => load_parquet(path, channels),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading sample from {}", path.display()))?;

    let label = match label {
        Some(l) => l.to_string(),
        None => default_label(path),
    };
    let raw = RawSample { label, rows };
    if raw.is_empty() {
        log::warn!("{}: {} contains no rows", raw.label, path.display());
    } else {
        log::info!("{}: read {} rows from {}", raw.label, raw.len(), path.display());
    }

    Ok(raw)
}

/// File stem of `path`, used when a sample has no explicit label.
pub fn default_label(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sample")
        .to_string()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with channel names as exported by the cytometer;
/// columns other than the two selected channels are ignored.
fn load_csv(path: &Path, channels: &ChannelSelection) -> Result<Vec<RawRow>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();

    let primary_idx = header_position(&headers, &channels.primary)?;
    let secondary_idx = header_position(&headers, &channels.secondary)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push((
            parse_reading(record.get(primary_idx)),
            parse_reading(record.get(secondary_idx)),
        ));
    }
    Ok(rows)
}

fn header_position(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .with_context(|| format!("CSV missing '{name}' column"))
}

fn parse_reading(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|s| s.trim().parse::<f64>().ok())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "FITC-A": 812.0, "PE-A": 95.5, "Time": 0.1 },
///   ...
/// ]
/// ```
///
/// Every record must carry both channel keys; `null` or non-numeric values
/// load as missing readings.
fn load_json(path: &Path, channels: &ChannelSelection) -> Result<Vec<RawRow>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            let primary = obj
                .get(&channels.primary)
                .with_context(|| format!("Row {i}: missing '{}'", channels.primary))?;
            let secondary = obj
                .get(&channels.secondary)
                .with_context(|| format!("Row {i}: missing '{}'", channels.secondary))?;
            Ok((primary.as_f64(), secondary.as_f64()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load the two channel columns from a Parquet file.
///
/// Channel columns may be Float64, Float32, Int32 or Int64; nulls load as
/// missing readings. Works with files written by Pandas, Polars and
/// FlowKit/fcsparser exports.
fn load_parquet(path: &Path, channels: &ChannelSelection) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let primary_idx = schema
            .index_of(&channels.primary)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{}' column", channels.primary))?;
        let secondary_idx = schema
            .index_of(&channels.secondary)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{}' column", channels.secondary))?;

        let primary = extract_f64_column(batch.column(primary_idx))
            .with_context(|| format!("reading '{}'", channels.primary))?;
        let secondary = extract_f64_column(batch.column(secondary_idx))
            .with_context(|| format!("reading '{}'", channels.secondary))?;

        rows.extend(primary.into_iter().zip(secondary));
    }

    Ok(rows)
}

/// Read a numeric Arrow column as optional `f64` values.
fn extract_f64_column(col: &Arc<dyn Array>) -> Result<Vec<Option<f64>>> {
    match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Ok(arr.iter().collect())
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Ok(arr.iter().map(|v| v.map(f64::from)).collect())
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Ok(arr.iter().map(|v| v.map(f64::from)).collect())
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Ok(arr.iter().map(|v| v.map(|i| i as f64)).collect())
        }
        other => bail!("Expected a numeric column, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv_selects_channels_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "control.csv",
            "Time,FITC-A,SSC-A,PE-A\n0.1,100.5,7,20\n0.2,-3,8,n/a\n0.3,,9,4.5\n",
        );

        let sample = load_sample(&path, &ChannelSelection::default(), None).unwrap();
        assert_eq!(sample.label, "control");
        assert_eq!(
            sample.rows,
            vec![
                (Some(100.5), Some(20.0)),
                (Some(-3.0), None),
                (None, Some(4.5)),
            ]
        );
    }

    #[test]
    fn test_load_csv_missing_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "bad.csv", "FITC-A,APC-A\n1,2\n");

        let err = load_sample(&path, &ChannelSelection::default(), None).unwrap_err();
        assert!(format!("{err:#}").contains("'PE-A'"));
    }

    #[test]
    fn test_load_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "treated.json",
            r#"[{"GFP": 3.5, "RFP": 1}, {"GFP": null, "RFP": "x"}]"#,
        );
        let channels = ChannelSelection {
            primary: "GFP".to_string(),
            secondary: "RFP".to_string(),
        };

        let sample = load_sample(&path, &channels, Some("treated 1h")).unwrap();
        assert_eq!(sample.label, "treated 1h");
        assert_eq!(sample.rows, vec![(Some(3.5), Some(1.0)), (None, None)]);
    }

    #[test]
    fn test_load_json_record_without_channel_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "partial.json", r#"[{"FITC-A": 1.0}]"#);
        assert!(load_sample(&path, &ChannelSelection::default(), None).is_err());
    }

    #[test]
    fn test_load_parquet_numeric_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("FITC-A", DataType::Float64, true),
            Field::new("PE-A", DataType::Int32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Float64Array::from(vec![Some(1.5), None, Some(3.0)])),
                Arc::new(Int32Array::from(vec![Some(10), Some(20), None])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let sample = load_sample(&path, &ChannelSelection::default(), None).unwrap();
        assert_eq!(sample.label, "run");
        assert_eq!(
            sample.rows,
            vec![(Some(1.5), Some(10.0)), (None, Some(20.0)), (Some(3.0), None)]
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "sample.fcs", "");
        let err = load_sample(&path, &ChannelSelection::default(), None).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
