use serde::{Deserialize, Serialize};

use crate::error::{EsgError, Result};

/// Validate a raw label vector and narrow it to binary cells.
///
/// Rejects empty vectors, vectors whose width differs from `num_labels`,
/// and any cell other than 0 or 1.
pub fn validate_label_vector(raw: &[i64], num_labels: usize) -> Result<Vec<u8>> {
    if raw.is_empty() {
        return Err(EsgError::EmptyLabels);
    }
    if raw.len() != num_labels {
        return Err(EsgError::LabelWidth {
            expected: num_labels,
            actual: raw.len(),
        });
    }

    raw.iter()
        .enumerate()
        .map(|(index, &value)| match value {
            0 => Ok(0),
            1 => Ok(1),
            _ => Err(EsgError::NonBinaryLabel { index, value }),
        })
        .collect()
}

/// Human-readable label names used to key metrics and logged parameters.
///
/// Indices past the configured list fall back to `label_<i>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelNames(Vec<String>);

impl LabelNames {
    /// Build a name list, rejecting lists longer than `num_labels`.
    pub fn new(names: Vec<String>, num_labels: usize) -> Result<Self> {
        if names.len() > num_labels {
            return Err(EsgError::TooManyLabelNames {
                names: names.len(),
                num_labels,
            });
        }
        Ok(Self(names))
    }

    /// Name list with only positional fallbacks.
    pub fn positional() -> Self {
        Self(Vec::new())
    }

    /// Name for label `index`.
    pub fn name(&self, index: usize) -> String {
        self.0
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("label_{index}"))
    }

    /// Number of explicitly configured names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no names are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
