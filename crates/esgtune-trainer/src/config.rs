//! Pipeline configuration loaded from `config.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use esgtune_core::chunking::chunker::{DEFAULT_PAD_TOKEN_ID, DEFAULT_STRIDE, DEFAULT_WINDOW_SIZE};
use esgtune_core::{ChunkerConfig, ClassWeightMethod, LabelNames};

/// Which rows class weights are counted over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightGranularity {
    /// One row per training chunk.
    #[default]
    Chunk,
    /// One row per training document.
    Document,
}

/// Optimizer and model hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingArgs {
    pub learning_rate: f64,
    pub per_device_train_batch_size: usize,
    pub num_train_epochs: usize,
    pub weight_decay: f64,
    pub seed: u64,
    pub hidden_size: usize,
    pub vocab_size: usize,
}

impl Default for TrainingArgs {
    fn default() -> Self {
        Self {
            learning_rate: 2e-5,
            per_device_train_batch_size: 2,
            num_train_epochs: 3,
            weight_decay: 0.01,
            seed: 42,
            hidden_size: 64,
            vocab_size: 50_265,
        }
    }
}

/// Every knob of the pipeline. Unknown keys are ignored so an existing
/// `config.json` with extra entries still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub num_labels: usize,
    pub label_names: Vec<String>,
    pub model_name: String,
    pub tokenizer_file: Option<PathBuf>,

    #[serde(alias = "window_size")]
    pub max_length: usize,
    pub stride: usize,
    pub pad_token_id: u32,
    /// Let the tokenizer wrap each document in its special tokens.
    pub add_special_tokens: bool,

    pub class_weight_method: ClassWeightMethod,
    pub class_weight_granularity: WeightGranularity,

    pub raw_csv_path: PathBuf,
    pub raw_jsonl_path: PathBuf,
    pub converted_csv_path: PathBuf,
    pub cleaned_jsonl_path: PathBuf,
    pub merged_jsonl_path: PathBuf,
    pub final_jsonl: PathBuf,
    pub hf_dataset: PathBuf,
    pub tokenizer_output_path: PathBuf,
    pub model_output_path: PathBuf,

    pub report_key_column: String,
    pub report_name_field: String,

    pub validation_fraction: f64,
    pub split_seed: u64,

    pub training_args: TrainingArgs,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_labels: 7,
            label_names: ["C1", "C2", "C3", "C5", "C8", "C9", "C10"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            model_name: "allenai/longformer-base-4096".into(),
            tokenizer_file: None,
            max_length: DEFAULT_WINDOW_SIZE,
            stride: DEFAULT_STRIDE,
            pad_token_id: DEFAULT_PAD_TOKEN_ID,
            add_special_tokens: true,
            class_weight_method: ClassWeightMethod::Balanced,
            class_weight_granularity: WeightGranularity::Chunk,
            raw_csv_path: "data/raw/labels.csv".into(),
            raw_jsonl_path: "data/raw/reports.jsonl".into(),
            converted_csv_path: "data/interim/labels_converted.csv".into(),
            cleaned_jsonl_path: "data/interim/reports_cleaned.jsonl".into(),
            merged_jsonl_path: "data/interim/merged.jsonl".into(),
            final_jsonl: "data/processed/dataset.jsonl".into(),
            hf_dataset: "data/processed/dataset".into(),
            tokenizer_output_path: "data/processed/tokenized".into(),
            model_output_path: "models".into(),
            report_key_column: "Raport".into(),
            report_name_field: "nazwa_raportu".into(),
            validation_fraction: 0.2,
            split_seed: 42,
            training_args: TrainingArgs::default(),
        }
    }
}

impl PipelineConfig {
    /// Read and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_labels == 0 {
            bail!("num_labels must be at least 1");
        }
        if self.label_names.len() > self.num_labels {
            bail!(
                "{} label names configured for {} labels",
                self.label_names.len(),
                self.num_labels
            );
        }
        self.chunker_config().validate()?;
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            bail!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            );
        }
        if self.training_args.per_device_train_batch_size == 0 {
            bail!("per_device_train_batch_size must be at least 1");
        }
        Ok(())
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig::new(self.max_length, self.stride).with_pad_token_id(self.pad_token_id)
    }

    pub fn names(&self) -> Result<LabelNames> {
        Ok(LabelNames::new(self.label_names.clone(), self.num_labels)?)
    }
}
