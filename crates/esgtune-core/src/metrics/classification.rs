//! Multi-label classification metrics.
//!
//! Every label is a separate binary problem. Undefined ratios (no predicted
//! and no true positives) count as 0.

use crate::types::{LabelMatrix, ProbMatrix};

/// Averaging strategy across labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Average {
    /// Unweighted mean of per-label F1.
    Macro,
    /// F1 of the pooled TP, FP, FN counts.
    Micro,
    /// Mean of per-label F1 weighted by support (true positives + false negatives).
    Weighted,
}

/// Confusion counts for one label column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelConfusion {
    pub tp: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl LabelConfusion {
    pub fn f1(&self) -> f64 {
        if self.tp == 0 {
            return 0.0;
        }
        (2 * self.tp) as f64 / (2 * self.tp + self.fp + self.fn_) as f64
    }

    /// Number of true instances.
    pub fn support(&self) -> usize {
        self.tp + self.fn_
    }

    fn add(&mut self, other: LabelConfusion) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
    }
}

fn confusions(truth: &LabelMatrix, pred: &LabelMatrix) -> Vec<LabelConfusion> {
    assert_eq!(truth.shape(), pred.shape(), "prediction shape mismatch");

    let mut counts = vec![LabelConfusion::default(); truth.cols()];
    for row in 0..truth.rows() {
        for (col, count) in counts.iter_mut().enumerate() {
            match (truth.get(row, col) == 1, pred.get(row, col) == 1) {
                (true, true) => count.tp += 1,
                (false, true) => count.fp += 1,
                (true, false) => count.fn_ += 1,
                (false, false) => {}
            }
        }
    }
    counts
}

/// Per-label F1, in label order.
///
/// # Panics
///
/// Panics if `truth` and `pred` differ in shape.
pub fn per_label_f1(truth: &LabelMatrix, pred: &LabelMatrix) -> Vec<f64> {
    confusions(truth, pred).iter().map(LabelConfusion::f1).collect()
}

/// F1 across all labels under the given averaging.
///
/// # Panics
///
/// Panics if `truth` and `pred` differ in shape.
pub fn f1_score(truth: &LabelMatrix, pred: &LabelMatrix, average: Average) -> f64 {
    let counts = confusions(truth, pred);
    if counts.is_empty() {
        return 0.0;
    }

    match average {
        Average::Macro => counts.iter().map(LabelConfusion::f1).sum::<f64>() / counts.len() as f64,
        Average::Micro => {
            let mut pooled = LabelConfusion::default();
            for c in &counts {
                pooled.add(*c);
            }
            pooled.f1()
        }
        Average::Weighted => {
            let total: usize = counts.iter().map(LabelConfusion::support).sum();
            if total == 0 {
                return 0.0;
            }
            counts
                .iter()
                .map(|c| c.f1() * c.support() as f64)
                .sum::<f64>()
                / total as f64
        }
    }
}

/// Fraction of rows whose whole predicted label vector equals the truth.
///
/// # Panics
///
/// Panics if `truth` and `pred` differ in shape.
pub fn exact_match_accuracy(truth: &LabelMatrix, pred: &LabelMatrix) -> f64 {
    assert_eq!(truth.shape(), pred.shape(), "prediction shape mismatch");
    if truth.rows() == 0 {
        return 0.0;
    }
    let hits = (0..truth.rows())
        .filter(|&row| truth.row(row) == pred.row(row))
        .count();
    hits as f64 / truth.rows() as f64
}

/// Binarize with one cutoff per column (`p >= cutoff`).
///
/// # Panics
///
/// Panics if `thresholds.len()` differs from the column count.
pub fn apply_thresholds(probs: &ProbMatrix, thresholds: &[f64]) -> LabelMatrix {
    assert_eq!(thresholds.len(), probs.cols(), "threshold count mismatch");
    probs.map_columns(|col, p| u8::from(p >= thresholds[col]))
}

/// Binarize every column with the same cutoff.
pub fn apply_threshold(probs: &ProbMatrix, threshold: f64) -> LabelMatrix {
    apply_thresholds(probs, &vec![threshold; probs.cols()])
}
