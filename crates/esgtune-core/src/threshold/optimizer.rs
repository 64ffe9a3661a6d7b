//! # Per-Label Threshold Optimization
//!
//! For every label column the decision cutoff that maximizes binary F1 on
//! the validation predictions is searched in `[0.1, 0.9]`. Labels are
//! independent: each search reads only its own column.

use crate::error::{EsgError, Result};
use crate::threshold::bounded::BoundedMinimizer;
use crate::types::{LabelMatrix, LabelNames, ProbMatrix};

/// Lower end of the threshold search interval.
pub const SEARCH_LOWER: f64 = 0.1;
/// Upper end of the threshold search interval.
pub const SEARCH_UPPER: f64 = 0.9;
/// Cutoff used when no tuning is applied.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Binary F1 of `probs >= threshold` against `truth`.
///
/// Returns 0.0 whenever there are no true positives, including the case
/// with no positives at all.
pub fn binary_f1(truth: &[u8], probs: &[f64], threshold: f64) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&t, &p) in truth.iter().zip(probs) {
        match (t == 1, p >= threshold) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    if tp == 0 {
        return 0.0;
    }
    (2 * tp) as f64 / (2 * tp + fp + fn_) as f64
}

/// Search result for one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelThreshold {
    pub threshold: f64,
    /// F1 at `threshold`.
    pub f1: f64,
    /// F1 at [`DEFAULT_THRESHOLD`].
    pub default_f1: f64,
    /// Objective evaluations spent by the search.
    pub evaluations: usize,
}

impl LabelThreshold {
    pub fn improvement(&self) -> f64 {
        self.f1 - self.default_f1
    }
}

/// Thresholds for all labels, in label order.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSearch {
    pub labels: Vec<LabelThreshold>,
}

impl ThresholdSearch {
    /// The threshold vector.
    pub fn thresholds(&self) -> Vec<f64> {
        self.labels.iter().map(|l| l.threshold).collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Finds F1-maximizing cutoffs per label.
#[derive(Debug, Clone)]
pub struct ThresholdOptimizer {
    minimizer: BoundedMinimizer,
}

impl Default for ThresholdOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdOptimizer {
    pub fn new() -> Self {
        Self {
            minimizer: BoundedMinimizer::new(SEARCH_LOWER, SEARCH_UPPER),
        }
    }

    /// Replace the underlying minimizer, e.g. to tighten its tolerance.
    ///
    /// The minimizer's bounds must lie within `[0.1, 0.9]`.
    pub fn with_minimizer(mut self, minimizer: BoundedMinimizer) -> Self {
        let (lower, upper) = minimizer.bounds();
        debug_assert!(lower >= SEARCH_LOWER && upper <= SEARCH_UPPER);
        self.minimizer = minimizer;
        self
    }

    /// Optimize one label column.
    ///
    /// If the search ends on a point scoring below the default cutoff, the
    /// default cutoff is kept instead.
    pub fn optimize_label(&self, truth: &[u8], probs: &[f64]) -> LabelThreshold {
        let result = self.minimizer.minimize(|t| -binary_f1(truth, probs, t));
        let f1 = -result.fun;
        let default_f1 = binary_f1(truth, probs, DEFAULT_THRESHOLD);

        let (threshold, f1) = if default_f1 > f1 {
            (DEFAULT_THRESHOLD, default_f1)
        } else {
            (result.x, f1)
        };

        LabelThreshold {
            threshold,
            f1,
            default_f1,
            evaluations: result.evaluations,
        }
    }

    /// Optimize every label column of `probs` against `truth`.
    pub fn optimize(
        &self,
        truth: &LabelMatrix,
        probs: &ProbMatrix,
        names: &LabelNames,
    ) -> Result<ThresholdSearch> {
        if truth.shape() != probs.shape() {
            return Err(EsgError::ShapeMismatch {
                labels: truth.shape(),
                predictions: probs.shape(),
            });
        }

        let labels: Vec<LabelThreshold> = (0..truth.cols())
            .map(|col| {
                let found = self.optimize_label(&truth.column(col), &probs.column(col));
                tracing::info!(
                    label = %names.name(col),
                    threshold = %format!("{:.3}", found.threshold),
                    f1 = %format!("{:.3}", found.f1),
                    improvement = %format!("{:+.3}", found.improvement()),
                    "optimized threshold"
                );
                found
            })
            .collect();

        let search = ThresholdSearch { labels };
        let thresholds = search.thresholds();
        if let (Some(min), Some(max)) = (
            thresholds.iter().copied().reduce(f64::min),
            thresholds.iter().copied().reduce(f64::max),
        ) {
            tracing::info!(min = %format!("{min:.3}"), max = %format!("{max:.3}"), "threshold optimization completed");
        }

        Ok(search)
    }
}
