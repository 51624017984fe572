use serde::Serialize;

// ---------------------------------------------------------------------------
// RawSample – rows as read from disk, before cleaning
// ---------------------------------------------------------------------------

/// One measured cell as read from the input table.
/// A reading is `None` when the cell was empty, null, or not a number.
pub type RawRow = (Option<f64>, Option<f64>);

/// A sample exactly as the loader produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub label: String,
    pub rows: Vec<RawRow>,
}

impl RawSample {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sample – paired primary/secondary readings, one pair per cell
// ---------------------------------------------------------------------------

/// A named set of paired observations.
///
/// `primary` and `secondary` always have the same length; index `i` of both
/// belongs to the same cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub label: String,
    primary: Vec<f64>,
    secondary: Vec<f64>,
}

impl Sample {
    /// Build a sample from `(primary, secondary)` pairs.
    pub fn from_pairs(label: impl Into<String>, pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let (primary, secondary) = pairs.into_iter().unzip();
        Sample {
            label: label.into(),
            primary,
            secondary,
        }
    }

    pub fn primary(&self) -> &[f64] {
        &self.primary
    }

    pub fn secondary(&self) -> &[f64] {
        &self.secondary
    }

    /// Iterate over `(primary, secondary)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.primary()
            .iter()
            .copied()
            .zip(self.secondary().iter().copied())
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// Whether the sample has no observations.
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Largest finite primary value, if any.
    pub fn max_primary(&self) -> Option<f64> {
        self.primary
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .max_by(|a, b| a.total_cmp(b))
    }
}

// ---------------------------------------------------------------------------
// BinSummary – one non-empty bin of the aggregator output
// ---------------------------------------------------------------------------

/// Summary of the secondary channel for the cells whose primary value lies in
/// `(bin_edge - width, bin_edge]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinSummary {
    /// Upper edge of the bin. Summaries are right-edge labelled.
    pub bin_edge: f64,
    pub count: usize,
    pub mean: f64,
    /// Sample (n-1) standard deviation over `sqrt(count)`.
    /// `None` when the bin holds a single observation.
    pub standard_error: Option<f64>,
}

// ---------------------------------------------------------------------------
// CombinedResult – every sample's bins, labelled and concatenated
// ---------------------------------------------------------------------------

/// A [`BinSummary`] tagged with the sample it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRow {
    pub sample: String,
    pub bin_edge: f64,
    pub count: usize,
    pub mean: f64,
    pub standard_error: Option<f64>,
}

impl CombinedRow {
    pub fn new(sample: &str, summary: &BinSummary) -> Self {
        CombinedRow {
            sample: sample.to_string(),
            bin_edge: summary.bin_edge,
            count: summary.count,
            mean: summary.mean,
            standard_error: summary.standard_error,
        }
    }
}

/// All samples' summaries in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CombinedResult {
    pub rows: Vec<CombinedRow>,
}

impl CombinedResult {
    /// Append one sample's summaries, labelled with `label`.
    pub fn extend_from_sample(&mut self, label: &str, summaries: &[BinSummary]) {
        self.rows
            .extend(summaries.iter().map(|s| CombinedRow::new(label, s)));
    }

    /// Distinct sample labels in the order they were added.
    pub fn sample_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !labels.contains(&row.sample.as_str()) {
                labels.push(row.sample.as_str());
            }
        }
        labels
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
