//! # Metrics Report
//!
//! Compares tuned per-label cutoffs against the flat 0.5 cutoff and
//! flattens everything into one `name -> value` mapping for trackers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EsgError, Result};
use crate::metrics::classification::{
    Average, apply_threshold, apply_thresholds, exact_match_accuracy, f1_score, per_label_f1,
};
use crate::threshold::DEFAULT_THRESHOLD;
use crate::types::{LabelMatrix, LabelNames, ProbMatrix};

/// Flat metric mapping produced by one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsReport {
    values: BTreeMap<String, f64>,
}

impl MetricsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the report with every key prefixed, e.g. `final_`.
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            values: self
                .values
                .iter()
                .map(|(k, &v)| (format!("{prefix}{k}"), v))
                .collect(),
        }
    }
}

/// Builds [`MetricsReport`]s.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    names: LabelNames,
}

impl MetricsAggregator {
    pub fn new(names: LabelNames) -> Self {
        Self { names }
    }

    /// Evaluate `probs` against `truth` under both the tuned `thresholds`
    /// and the flat default cutoff.
    ///
    /// Keys: `f1_macro`, `f1_micro`, `f1_weighted`, `accuracy`, their
    /// `_default` counterparts (weighted excluded), `f1_macro_improvement`,
    /// `accuracy_improvement`, and per label `f1_<name>`,
    /// `f1_<name>_default`, `f1_<name>_improvement`, `threshold_<name>`.
    pub fn aggregate(
        &self,
        truth: &LabelMatrix,
        probs: &ProbMatrix,
        thresholds: &[f64],
    ) -> Result<MetricsReport> {
        if truth.shape() != probs.shape() {
            return Err(EsgError::ShapeMismatch {
                labels: truth.shape(),
                predictions: probs.shape(),
            });
        }
        if thresholds.len() != truth.cols() {
            return Err(EsgError::ThresholdWidth {
                expected: truth.cols(),
                actual: thresholds.len(),
            });
        }

        let tuned = apply_thresholds(probs, thresholds);
        let default = apply_threshold(probs, DEFAULT_THRESHOLD);

        let f1_macro = f1_score(truth, &tuned, Average::Macro);
        let f1_micro = f1_score(truth, &tuned, Average::Micro);
        let f1_weighted = f1_score(truth, &tuned, Average::Weighted);
        let accuracy = exact_match_accuracy(truth, &tuned);
        let per_label = per_label_f1(truth, &tuned);

        let f1_macro_default = f1_score(truth, &default, Average::Macro);
        let f1_micro_default = f1_score(truth, &default, Average::Micro);
        let accuracy_default = exact_match_accuracy(truth, &default);
        let per_label_default = per_label_f1(truth, &default);

        let mut report = MetricsReport::new();
        report.insert("f1_macro", f1_macro);
        report.insert("f1_micro", f1_micro);
        report.insert("f1_weighted", f1_weighted);
        report.insert("accuracy", accuracy);
        report.insert("f1_macro_default", f1_macro_default);
        report.insert("f1_micro_default", f1_micro_default);
        report.insert("accuracy_default", accuracy_default);
        report.insert("f1_macro_improvement", f1_macro - f1_macro_default);
        report.insert("accuracy_improvement", accuracy - accuracy_default);

        for (i, ((&f1, &f1_default), &threshold)) in per_label
            .iter()
            .zip(&per_label_default)
            .zip(thresholds)
            .enumerate()
        {
            let name = self.names.name(i);
            report.insert(format!("f1_{name}"), f1);
            report.insert(format!("f1_{name}_default"), f1_default);
            report.insert(format!("f1_{name}_improvement"), f1 - f1_default);
            report.insert(format!("threshold_{name}"), threshold);
        }

        tracing::info!(
            f1_macro = %format!("{f1_macro_default:.4} -> {f1_macro:.4}"),
            accuracy = %format!("{accuracy_default:.4} -> {accuracy:.4}"),
            "threshold optimization results"
        );

        Ok(report)
    }
}
