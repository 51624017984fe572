use serde::{Deserialize, Serialize};

use super::model::{RawRow, RawSample, Sample};

// ---------------------------------------------------------------------------
// Cleaning rules: which raw rows reach the aggregator
// ---------------------------------------------------------------------------

/// Row-level cleaning applied between loading and transforming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningRules {
    /// Drop rows where either channel is zero or negative. Compensated
    /// cytometer channels routinely go negative, and those rows cannot be
    /// log-transformed.
    #[serde(default = "default_true")]
    pub drop_non_positive: bool,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self {
            drop_non_positive: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// How many rows survived cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub kept: usize,
    pub dropped: usize,
}

/// Return the pair a row contributes, or `None` when the row is rejected.
///
/// A row passes when:
/// * both readings are present and finite
/// * with `drop_non_positive`, both readings are `> 0`
pub fn accept_row(row: &RawRow, rules: &CleaningRules) -> Option<(f64, f64)> {
    let (primary, secondary) = (row.0?, row.1?);
    if !primary.is_finite() || !secondary.is_finite() {
        return None;
    }
    if rules.drop_non_positive && (primary <= 0.0 || secondary <= 0.0) {
        return None;
    }
    Some((primary, secondary))
}

/// Apply `rules` to every row of `raw`, producing a clean [`Sample`].
pub fn clean(raw: &RawSample, rules: &CleaningRules) -> (Sample, CleaningReport) {
    let sample = Sample::from_pairs(
        raw.label.clone(),
        raw.rows.iter().filter_map(|row| accept_row(row, rules)),
    );
    let report = CleaningReport {
        kept: sample.len(),
        dropped: raw.len() - sample.len(),
    };

    if report.dropped > 0 {
        log::warn!(
            "{}: dropped {} of {} rows during cleaning",
            raw.label,
            report.dropped,
            raw.len()
        );
    }

    (sample, report)
}

/// Remove pairs where either channel is NaN or infinite.
///
/// Transforms can produce these from readings cleaning let through, e.g.
/// `log10` of a zero or negative value kept by `drop_non_positive = false`.
/// Returns the finite sample and the number of pairs removed.
pub fn retain_finite(sample: Sample) -> (Sample, usize) {
    let is_finite = |&(p, s): &(f64, f64)| p.is_finite() && s.is_finite();
    if sample.pairs().all(|pair| is_finite(&pair)) {
        return (sample, 0);
    }
    let finite = Sample::from_pairs(sample.label.clone(), sample.pairs().filter(is_finite));
    let removed = sample.len() - finite.len();
    (finite, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: Vec<RawRow>) -> RawSample {
        RawSample {
            label: "raw".to_string(),
            rows,
        }
    }

    #[test]
    fn test_default_rules_drop_missing_and_non_positive() {
        let input = raw(vec![
            (Some(10.0), Some(2.0)),
            (Some(0.0), Some(2.0)),
            (Some(5.0), Some(-1.0)),
            (None, Some(3.0)),
            (Some(f64::NAN), Some(3.0)),
            (Some(7.0), Some(f64::INFINITY)),
            (Some(1.0), Some(1.0)),
        ]);

        let (sample, report) = clean(&input, &CleaningRules::default());
        assert_eq!(sample.primary(), &[10.0, 1.0]);
        assert_eq!(sample.secondary(), &[2.0, 1.0]);
        assert_eq!(report, CleaningReport { kept: 2, dropped: 5 });
        assert_eq!(sample.label, "raw");
    }

    #[test]
    fn test_keeping_non_positive_still_drops_missing() {
        let input = raw(vec![
            (Some(-2.0), Some(0.0)),
            (None, None),
            (Some(3.0), Some(4.0)),
        ]);
        let rules = CleaningRules {
            drop_non_positive: false,
        };

        let (sample, report) = clean(&input, &rules);
        assert_eq!(sample.primary(), &[-2.0, 3.0]);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_accept_row() {
        let rules = CleaningRules::default();
        assert_eq!(accept_row(&(Some(1.0), Some(2.0)), &rules), Some((1.0, 2.0)));
        assert_eq!(accept_row(&(Some(1.0), None), &rules), None);
        assert_eq!(accept_row(&(Some(-1.0), Some(2.0)), &rules), None);
    }

    #[test]
    fn test_retain_finite_removes_nan_and_infinite_pairs() {
        let sample = Sample::from_pairs(
            "t",
            vec![(1.0, 2.0), (f64::NAN, 1.0), (0.5, f64::NEG_INFINITY), (3.0, 4.0)],
        );
        let (finite, removed) = retain_finite(sample);
        assert_eq!(removed, 2);
        assert_eq!(finite.primary(), &[1.0, 3.0]);
        assert_eq!(finite.secondary(), &[2.0, 4.0]);
        assert_eq!(finite.label, "t");

        let tidy = Sample::from_pairs("c", vec![(1.0, 1.0)]);
        assert_eq!(retain_finite(tidy.clone()), (tidy, 0));
    }
}
