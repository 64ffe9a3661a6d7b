//! Evaluation entry point: raw logits in, tuned thresholds and metrics out.

use crate::error::Result;
use crate::metrics::{MetricsAggregator, MetricsReport};
use crate::threshold::{ThresholdOptimizer, ThresholdSearch};
use crate::types::{LabelMatrix, LabelNames, Matrix, ProbMatrix};

/// Logistic function.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Logits to probabilities, cell by cell.
pub fn probabilities(logits: &Matrix<f64>) -> ProbMatrix {
    logits.map(sigmoid)
}

/// Result of one evaluation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub search: ThresholdSearch,
    pub report: MetricsReport,
}

/// Apply the logistic transform, tune per-label thresholds on the result,
/// and build the comparative metrics report.
pub fn evaluate_logits(
    truth: &LabelMatrix,
    logits: &Matrix<f64>,
    names: &LabelNames,
) -> Result<Evaluation> {
    let probs = probabilities(logits);
    let search = ThresholdOptimizer::new().optimize(truth, &probs, names)?;
    let report = MetricsAggregator::new(names.clone()).aggregate(truth, &probs, &search.thresholds())?;
    Ok(Evaluation { search, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EsgError;

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.9999);
        assert!(sigmoid(-10.0) < 0.0001);
        assert!(sigmoid(-1000.0) >= 0.0);
    }

    #[test]
    fn test_evaluate_logits() {
        let truth = LabelMatrix::from_label_rows(&[[1u8, 0], [1, 0], [0, 1], [0, 1]], 2).unwrap();
        // logit(0.9), logit(0.6), ... of the separable scenario
        let logit = |p: f64| (p / (1.0 - p)).ln();
        let rows = [[0.9, 0.1], [0.6, 0.2], [0.3, 0.8], [0.4, 0.7]]
            .map(|row| row.map(logit));
        let logits = Matrix::from_rows(&rows, 2).unwrap();

        let names = LabelNames::new(vec!["C1".into(), "C2".into()], 2).unwrap();
        let evaluation = evaluate_logits(&truth, &logits, &names).unwrap();

        assert_eq!(evaluation.search.len(), 2);
        assert_eq!(evaluation.report.get("f1_C1"), Some(1.0));
        assert_eq!(evaluation.report.get("f1_macro"), Some(1.0));
        let threshold = evaluation.report.get("threshold_C1").unwrap();
        assert!(threshold <= 0.6);
    }

    #[test]
    fn test_evaluate_shape_mismatch() {
        let truth = LabelMatrix::from_label_rows(&[[1u8, 0]], 2).unwrap();
        let logits = Matrix::from_rows(&[[0.0f64, 0.0], [1.0, 1.0]], 2).unwrap();
        let err = evaluate_logits(&truth, &logits, &LabelNames::positional()).unwrap_err();
        assert!(matches!(err, EsgError::ShapeMismatch { .. }));
    }
}
