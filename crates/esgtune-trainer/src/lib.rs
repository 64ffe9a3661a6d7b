//! # esgtune Trainer
//!
//! The pipeline around the core: configuration, raw data conversion,
//! dataset split, chunk tokenization, the training loop, evaluation of
//! stored predictions and experiment tracking.

pub mod config;
pub mod data;
pub mod dataset;
pub mod model;
pub mod pipeline;
pub mod tokenize;
pub mod tracker;
pub mod trainer;

pub use config::{PipelineConfig, TrainingArgs, WeightGranularity};
pub use model::{ChunkClassifier, ClassifierConfig, MeanPoolClassifier};
pub use tracker::{ExperimentTracker, JsonlTracker, TracingTracker};
pub use trainer::{FitSummary, Trainer, TrainerConfig};
