//! # esgtune Core
//!
//! The algorithmic core of the esgtune pipeline: overlapping-window
//! chunking with document provenance, per-label class weighting, per-label
//! decision threshold optimization, and comparative multi-label metrics.
//!
//! ## Quick Start
//!
//! ```rust
//! use esgtune_core::{LabelMatrix, LabelNames, ProbMatrix, ThresholdOptimizer};
//!
//! let y = LabelMatrix::from_label_rows(&[[1u8, 0], [1, 0], [0, 1], [0, 1]], 2).unwrap();
//! let p = ProbMatrix::from_rows(&[[0.9, 0.1], [0.6, 0.2], [0.3, 0.8], [0.4, 0.7]], 2).unwrap();
//!
//! let search = ThresholdOptimizer::new()
//!     .optimize(&y, &p, &LabelNames::positional())
//!     .unwrap();
//! assert_eq!(search.labels[0].f1, 1.0);
//! ```
pub mod chunking;
pub mod error;
pub mod evaluate;
pub mod loss;
pub mod metrics;
pub mod threshold;
pub mod types;
pub mod weights;

// Re-export primary API
pub use chunking::{Chunker, ChunkerConfig, HfTokenizerBackend, TokenizerBackend};
pub use error::{EsgError, Result};
pub use evaluate::{Evaluation, evaluate_logits, probabilities, sigmoid};
pub use loss::{LossStrategy, WeightedBceWithLogits, pos_weight_tensor};
pub use metrics::{MetricsAggregator, MetricsReport};
pub use threshold::{ThresholdOptimizer, ThresholdSearch};
pub use types::{
    Chunk, ChunkSet, Corpus, Document, LabelMatrix, LabelNames, Matrix, ProbMatrix, RawDocument,
    Split,
};
pub use weights::{ClassWeightMethod, compute_class_weights};
