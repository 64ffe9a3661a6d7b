use thiserror::Error;

/// Errors that can occur during esgtune core operations.
#[derive(Debug, Error)]
pub enum EsgError {
    /// A document or matrix row carries a label vector of the wrong width.
    #[error("label vector has {actual} entries, expected {expected}")]
    LabelWidth {
        /// Configured number of labels.
        expected: usize,
        /// Observed number of entries.
        actual: usize,
    },

    /// A label vector is empty.
    #[error("label vector is empty")]
    EmptyLabels,

    /// A label cell holds something other than 0 or 1.
    #[error("label value {value} at index {index} is not binary")]
    NonBinaryLabel {
        /// Column index of the offending cell.
        index: usize,
        /// The rejected value.
        value: i64,
    },

    /// A matrix row has a different width than the first row.
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        /// Offending row index.
        row: usize,
        /// Expected column count.
        expected: usize,
        /// Observed column count.
        actual: usize,
    },

    /// Ground truth and predictions do not line up.
    #[error("shape mismatch: labels are {labels:?}, predictions are {predictions:?}")]
    ShapeMismatch {
        /// (rows, cols) of the label matrix.
        labels: (usize, usize),
        /// (rows, cols) of the prediction matrix.
        predictions: (usize, usize),
    },

    /// A split tag other than `train` or `validation`.
    #[error("unknown split tag: {0:?}")]
    UnknownSplit(String),

    /// Window/stride combination that cannot produce overlapping chunks.
    #[error("invalid chunking parameters: {0}")]
    InvalidChunking(String),

    /// More human-readable label names than labels.
    #[error("{names} label names configured for {num_labels} labels")]
    TooManyLabelNames {
        /// Number of configured names.
        names: usize,
        /// Configured number of labels.
        num_labels: usize,
    },

    /// Threshold vector width disagrees with the number of labels.
    #[error("{actual} thresholds supplied for {expected} labels")]
    ThresholdWidth {
        /// Expected number of thresholds.
        expected: usize,
        /// Number supplied.
        actual: usize,
    },

    /// Tokenization backend failure.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Candle ML framework error.
    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Result type alias for esgtune core operations.
pub type Result<T> = std::result::Result<T, EsgError>;
