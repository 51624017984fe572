use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::binning::{BinWidth, aggregate};
use crate::data::filter::{CleaningReport, CleaningRules, clean, retain_finite};
use crate::data::loader::{ChannelSelection, load_sample};
use crate::data::model::{BinSummary, CombinedResult, RawSample};
use crate::data::transform::Transform;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// One sample file to process, optionally with an explicit label.
///
/// On the command line this is written `PATH` or `LABEL=PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub path: PathBuf,
}

impl FromStr for SampleSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("sample path is empty".to_string());
        }
        match s.split_once('=') {
            Some((label, path)) if is_label(label) && !path.is_empty() => Ok(SampleSource {
                label: Some(label.to_string()),
                path: PathBuf::from(path),
            }),
            _ => Ok(SampleSource {
                label: None,
                path: PathBuf::from(s),
            }),
        }
    }
}

/// A label is the text before the first `=`, unless that text contains a path
/// separator, in which case the `=` belongs to an unlabelled path.
fn is_label(text: &str) -> bool {
    !text.is_empty() && !text.contains(['/', '\\'])
}

impl fmt::Display for SampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label}={}", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// Everything needed to turn a sample file into bin summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub channels: ChannelSelection,
    pub cleaning: CleaningRules,
    pub transform: Transform,
    pub bin_width: BinWidth,
}

// ---------------------------------------------------------------------------
// Per-sample processing
// ---------------------------------------------------------------------------

/// Result of running one sample through clean → transform → aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub label: String,
    pub cleaning: CleaningReport,
    pub summaries: Vec<BinSummary>,
}

/// Clean, transform and bin an already loaded sample.
///
/// Rows the transform maps to NaN or an infinity are dropped before binning
/// and counted in the cleaning report.
pub fn summarize(raw: &RawSample, settings: &PipelineSettings) -> SampleOutcome {
    let (cleaned, mut cleaning) = clean(raw, &settings.cleaning);
    if cleaned.is_empty() {
        log::warn!("{}: no rows left after cleaning", raw.label);
    }
    let (transformed, non_finite) = retain_finite(settings.transform.apply_to_sample(&cleaned));
    if non_finite > 0 {
        cleaning.kept -= non_finite;
        cleaning.dropped += non_finite;
        log::warn!(
            "{}: dropped {non_finite} rows that {} maps to non-finite values",
            raw.label,
            settings.transform
        );
    }
    let summaries = aggregate(&transformed, settings.bin_width);

    if summaries.is_empty() {
        log::warn!("{}: no non-empty bins", raw.label);
    } else {
        log::info!(
            "{}: {} cells in {} bins (transform {}, width {})",
            raw.label,
            summaries.iter().map(|s| s.count).sum::<usize>(),
            summaries.len(),
            settings.transform,
            settings.bin_width
        );
    }

    SampleOutcome {
        label: raw.label.clone(),
        cleaning,
        summaries,
    }
}

/// Load one sample file and summarise it.
pub fn process_sample(source: &SampleSource, settings: &PipelineSettings) -> Result<SampleOutcome> {
    let raw = load_sample(&source.path, &settings.channels, source.label.as_deref())?;
    Ok(summarize(&raw, settings))
}

/// Process every sample in order and concatenate the labelled summaries.
///
/// The first sample that fails to load aborts the run.
pub fn run(sources: &[SampleSource], settings: &PipelineSettings) -> Result<CombinedResult> {
    let mut combined = CombinedResult::default();
    for source in sources {
        let outcome = process_sample(source, settings)
            .with_context(|| format!("processing sample '{source}'"))?;
        log::debug!(
            "{}: kept {} rows, dropped {}",
            outcome.label,
            outcome.cleaning.kept,
            outcome.cleaning.dropped
        );
        combined.extend_from_sample(&outcome.label, &outcome.summaries);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(transform: Transform, width: f64) -> PipelineSettings {
        PipelineSettings {
            channels: ChannelSelection::default(),
            cleaning: CleaningRules::default(),
            transform,
            bin_width: BinWidth::new(width).unwrap(),
        }
    }

    #[test]
    fn test_parse_sample_source() {
        let plain: SampleSource = "data/a.csv".parse().unwrap();
        assert_eq!(plain.label, None);
        assert_eq!(plain.path, PathBuf::from("data/a.csv"));

        let labelled: SampleSource = "control=data/a.csv".parse().unwrap();
        assert_eq!(labelled.label.as_deref(), Some("control"));
        assert_eq!(labelled.path, PathBuf::from("data/a.csv"));
        assert_eq!(labelled.to_string(), "control=data/a.csv");

        assert!("".parse::<SampleSource>().is_err());
    }

    #[test]
    fn test_parse_sample_source_with_equals_in_path() {
        let plain: SampleSource = "runs/a=b.csv".parse().unwrap();
        assert_eq!(plain.label, None);
        assert_eq!(plain.path, PathBuf::from("runs/a=b.csv"));

        let windows: SampleSource = r"runs\a=b.csv".parse().unwrap();
        assert_eq!(windows.label, None);

        let labelled: SampleSource = "ctrl=runs/a=b.csv".parse().unwrap();
        assert_eq!(labelled.label.as_deref(), Some("ctrl"));
        assert_eq!(labelled.path, PathBuf::from("runs/a=b.csv"));
    }

    #[test]
    fn test_summarize_cleans_before_binning() {
        let raw = RawSample {
            label: "mixed".to_string(),
            rows: vec![
                (Some(0.1), Some(1.0)),
                (Some(0.2), Some(3.0)),
                (Some(-0.3), Some(100.0)),
                (Some(0.6), None),
                (Some(0.6), Some(5.0)),
                (Some(0.6), Some(7.0)),
            ],
        };

        let outcome = summarize(&raw, &settings(Transform::Identity, 0.5));
        assert_eq!(outcome.cleaning, CleaningReport { kept: 4, dropped: 2 });
        assert_eq!(outcome.summaries.len(), 2);
        assert_eq!(outcome.summaries[0].count, 2);
        assert!((outcome.summaries[0].mean - 2.0).abs() < 1e-12);
        assert!((outcome.summaries[1].mean - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_applies_log_transform() {
        // log10 primaries: 1.0, 1.0, 2.0 ; log10 secondaries: 1, 3, 2
        let raw = RawSample {
            label: "log".to_string(),
            rows: vec![
                (Some(10.0), Some(10.0)),
                (Some(10.0), Some(1000.0)),
                (Some(100.0), Some(100.0)),
            ],
        };

        let outcome = summarize(&raw, &settings(Transform::Log10, 1.0));
        assert_eq!(outcome.summaries.len(), 2);
        assert_eq!(outcome.summaries[0].count, 2);
        assert!((outcome.summaries[0].mean - 2.0).abs() < 1e-9);
        assert!((outcome.summaries[1].bin_edge - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_drops_rows_the_transform_cannot_map() {
        let raw = RawSample {
            label: "kept".to_string(),
            rows: vec![(Some(10.0), Some(100.0)), (Some(10.0), Some(-5.0))],
        };
        let mut settings = settings(Transform::Log10, 1.0);
        settings.cleaning.drop_non_positive = false;

        let outcome = summarize(&raw, &settings);
        assert_eq!(outcome.cleaning, CleaningReport { kept: 1, dropped: 1 });
        assert_eq!(outcome.summaries.len(), 1);
        assert_eq!(outcome.summaries[0].count, 1);
        assert!((outcome.summaries[0].mean - 2.0).abs() < 1e-9);
        assert!(outcome.summaries.iter().all(|s| s.mean.is_finite()));
    }

    #[test]
    fn test_run_concatenates_samples_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "FITC-A,PE-A\n0.1,1\n0.2,3\n").unwrap();
        std::fs::write(&b, "FITC-A,PE-A\n0.7,2\n0.1,4\n").unwrap();

        let sources = vec![
            SampleSource {
                label: Some("second".to_string()),
                path: b,
            },
            SampleSource { label: None, path: a },
        ];
        let result = run(&sources, &settings(Transform::Identity, 0.5)).unwrap();

        assert_eq!(result.sample_labels(), vec!["second", "a"]);
        assert_eq!(result.len(), 3);
        assert_eq!(result.rows[0].sample, "second");
        assert!((result.rows[0].bin_edge - 0.5).abs() < 1e-12);
        assert!((result.rows[1].bin_edge - 1.0).abs() < 1e-12);
        assert_eq!(result.rows[2].count, 2);
    }

    #[test]
    fn test_run_reports_failing_sample() {
        let sources = vec![SampleSource {
            label: None,
            path: PathBuf::from("does/not/exist.csv"),
        }];
        let err = run(&sources, &settings(Transform::Log10, 0.1)).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.csv"));
    }
}
