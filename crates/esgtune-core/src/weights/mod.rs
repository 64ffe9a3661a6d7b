//! # Class Weights
//!
//! Per-label positive-class weights for multi-label training. Each label
//! column is weighted independently; the result feeds the `pos_weight`
//! argument of the weighted binary cross-entropy loss.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{LabelMatrix, LabelNames};

/// Weighting policy for positive examples.
///
/// Parsing never fails: an unrecognized name maps to [`ClassWeightMethod::Unweighted`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClassWeightMethod {
    /// `total / (2 * pos)`
    #[default]
    Balanced,
    /// `sqrt(1 / freq)`
    Sqrt,
    /// `ln(1 / freq)`
    Log,
    /// Weight 1.0 everywhere; keeps the name it was configured with.
    Unweighted(String),
}

impl ClassWeightMethod {
    pub fn parse(name: &str) -> Self {
        match name {
            "balanced" => Self::Balanced,
            "sqrt" => Self::Sqrt,
            "log" => Self::Log,
            other => Self::Unweighted(other.to_string()),
        }
    }

    /// Weight for one label column given its positive and total counts.
    pub fn weight(&self, count_pos: usize, count_total: usize) -> f64 {
        let freq = if count_total > 0 {
            count_pos as f64 / count_total as f64
        } else {
            0.0
        };

        match self {
            Self::Balanced if count_pos > 0 => count_total as f64 / (2.0 * count_pos as f64),
            Self::Sqrt if freq > 0.0 => (1.0 / freq).sqrt(),
            Self::Log if freq > 0.0 => (1.0 / freq).ln(),
            _ => 1.0,
        }
    }
}

impl From<String> for ClassWeightMethod {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ClassWeightMethod> for String {
    fn from(method: ClassWeightMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for ClassWeightMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Balanced => write!(f, "balanced"),
            Self::Sqrt => write!(f, "sqrt"),
            Self::Log => write!(f, "log"),
            Self::Unweighted(name) => write!(f, "{name}"),
        }
    }
}

/// Positive/negative counts for one label column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelCounts {
    pub count_pos: usize,
    pub count_neg: usize,
    pub count_total: usize,
}

impl LabelCounts {
    pub fn from_column(column: &[u8]) -> Self {
        let count_pos = column.iter().filter(|&&v| v == 1).count();
        let count_neg = column.iter().filter(|&&v| v == 0).count();
        Self {
            count_pos,
            count_neg,
            count_total: column.len(),
        }
    }

    pub fn positive_rate(&self) -> f64 {
        if self.count_total == 0 {
            0.0
        } else {
            self.count_pos as f64 / self.count_total as f64
        }
    }
}

/// Compute one positive-class weight per label column, in label order.
pub fn compute_class_weights(
    labels: &LabelMatrix,
    method: &ClassWeightMethod,
    names: &LabelNames,
) -> Vec<f64> {
    if let ClassWeightMethod::Unweighted(name) = method {
        tracing::warn!(method = %name, "unrecognized class weight method, using 1.0 for all labels");
    }

    let weights: Vec<f64> = (0..labels.cols())
        .map(|col| {
            let counts = LabelCounts::from_column(&labels.column(col));
            let weight = method.weight(counts.count_pos, counts.count_total);
            tracing::info!(
                label = %names.name(col),
                positive = counts.count_pos,
                total = counts.count_total,
                rate = %format!("{:.1}%", counts.positive_rate() * 100.0),
                weight = %format!("{weight:.3}"),
                "class weight"
            );
            weight
        })
        .collect();

    if let (Some(min), Some(max)) = (
        weights.iter().copied().reduce(f64::min),
        weights.iter().copied().reduce(f64::max),
    ) {
        tracing::info!(%method, min = %format!("{min:.3}"), max = %format!("{max:.3}"), "class weights computed");
    }

    weights
}
