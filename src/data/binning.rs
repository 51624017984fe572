use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::model::{BinSummary, Sample};

// ---------------------------------------------------------------------------
// BinWidth – validated, strictly positive bin width
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BinWidthError {
    #[error("bin width must be finite, got {0}")]
    NotFinite(f64),
    #[error("bin width must be greater than zero, got {0}")]
    NotPositive(f64),
    #[error("bin width '{0}' is not a number")]
    Parse(String),
}

/// Largest bin index that can be assigned. Up to `2^53` every index, and so
/// every edge multiplier, is an exact `f64` integer.
pub const MAX_BIN_INDEX: u64 = 1 << 53;

/// Width of every bin. Bin `i` is the half-open interval `(i*w, (i+1)*w]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BinWidth(f64);

impl BinWidth {
    pub fn new(width: f64) -> Result<Self, BinWidthError> {
        if !width.is_finite() {
            return Err(BinWidthError::NotFinite(width));
        }
        if width <= 0.0 {
            return Err(BinWidthError::NotPositive(width));
        }
        Ok(BinWidth(width))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Lower (exclusive) edge of bin `index`.
    pub fn lower_edge(self, index: u64) -> f64 {
        index as f64 * self.0
    }

    /// Upper (inclusive) edge of bin `index`.
    pub fn upper_edge(self, index: u64) -> f64 {
        index.saturating_add(1) as f64 * self.0
    }

    /// Index of the bin containing `x`.
    ///
    /// Values `<= 0` and non-finite values belong to no bin, and so does a
    /// value whose bin index would exceed [`MAX_BIN_INDEX`]. The estimate from
    /// `ceil(x / w)` is corrected against the edge products so that the result
    /// always satisfies `lower_edge(i) < x <= upper_edge(i)`.
    pub fn bin_index(self, x: f64) -> Option<u64> {
        if !x.is_finite() || x <= 0.0 {
            return None;
        }
        let estimate = (x / self.0).ceil();
        if !estimate.is_finite() || estimate > MAX_BIN_INDEX as f64 {
            return None;
        }
        let mut index = (estimate as u64).saturating_sub(1);
        while index > 0 && x <= self.lower_edge(index) {
            index -= 1;
        }
        while index < MAX_BIN_INDEX && x > self.upper_edge(index) {
            index += 1;
        }
        (x <= self.upper_edge(index)).then_some(index)
    }
}

impl fmt::Display for BinWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BinWidth {
    type Err = BinWidthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let width = s
            .trim()
            .parse::<f64>()
            .map_err(|_| BinWidthError::Parse(s.to_string()))?;
        BinWidth::new(width)
    }
}

// ---------------------------------------------------------------------------
// Streaming mean / variance (Welford)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    mean: f64,
    sum_sq_diff: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let diff_before = value - self.mean;
        self.mean += diff_before / self.count as f64;
        let diff_after = value - self.mean;
        self.sum_sq_diff += diff_before * diff_after;
    }

    /// Undefined for an empty bin.
    fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample (n-1) standard deviation; undefined below two observations.
    fn std_dev(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.sum_sq_diff / (self.count - 1) as f64).sqrt())
    }

    fn standard_error(&self) -> Option<f64> {
        self.std_dev().map(|sd| sd / (self.count as f64).sqrt())
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Bin the primary channel of `sample` and summarise the secondary channel
/// per bin.
///
/// Only bins that receive an observation are created, so every returned
/// summary has `count >= 1` and the output is sorted by `bin_edge` without
/// duplicates. Observations whose primary value is not positive fall into no
/// bin. Observations too large to index at this width are skipped with a
/// warning.
pub fn aggregate(sample: &Sample, width: BinWidth) -> Vec<BinSummary> {
    let mut bins: BTreeMap<u64, Accumulator> = BTreeMap::new();
    let mut out_of_range = 0usize;
    for (primary, secondary) in sample.pairs() {
        match width.bin_index(primary) {
            Some(index) => bins.entry(index).or_default().add(secondary),
            None if primary.is_finite() && primary > 0.0 => out_of_range += 1,
            None => {}
        }
    }

    if out_of_range > 0 {
        log::warn!(
            "{}: skipped {out_of_range} observations beyond bin index {MAX_BIN_INDEX} at width {width}",
            sample.label
        );
    }

    let summaries: Vec<BinSummary> = bins
        .iter()
        .filter_map(|(&index, acc)| {
            let mean = acc.mean()?;
            Some(BinSummary {
                bin_edge: width.upper_edge(index),
                count: acc.count,
                mean,
                standard_error: acc.standard_error(),
            })
        })
        .collect();

    log::debug!(
        "{}: {} observations up to {:?}, {} non-empty bins (width {width})",
        sample.label,
        sample.len(),
        sample.max_primary(),
        summaries.len()
    );

    summaries
}
