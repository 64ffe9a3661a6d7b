//! # esgtune
//!
//! Multi-label ESG report classification: overlapping-window chunking with
//! document provenance, class-imbalance weighting, per-label threshold
//! tuning and comparative metrics, plus the data and training pipeline
//! around them.
//!
//! The algorithmic pieces live in [`esgtune_core`]; the file-driven
//! pipeline, the training loop and experiment trackers live in
//! [`esgtune_trainer`].

pub use esgtune_core;
pub use esgtune_trainer;

pub use esgtune_core::{
    Chunk, ChunkSet, Chunker, ChunkerConfig, ClassWeightMethod, Corpus, Document, EsgError,
    Evaluation, LabelMatrix, LabelNames, MetricsAggregator, MetricsReport, ProbMatrix, Split,
    ThresholdOptimizer, compute_class_weights, evaluate_logits,
};
pub use esgtune_trainer::{ExperimentTracker, PipelineConfig};
