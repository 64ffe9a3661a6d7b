//! Config-driven pipeline steps, in execution order.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use esgtune_core::{
    Chunker, Evaluation, HfTokenizerBackend, LabelMatrix, Matrix, Split, WeightedBceWithLogits,
    evaluate_logits,
};

use crate::config::PipelineConfig;
use crate::data::{
    LabelTable, MergeStats, clean_jsonl, convert_csv_file, convert_labels_to_int,
    merge_with_labels, read_jsonl, write_jsonl,
};
use crate::dataset::create_dataset;
use crate::model::{ClassifierConfig, MeanPoolClassifier};
use crate::tokenize::{TokenizeSummary, load_chunks, tokenize_dataset};
use crate::tracker::ExperimentTracker;
use crate::trainer::{FitSummary, Trainer, TrainerConfig, training_class_weights};

/// CSV conversion, text cleaning, label merge and integer conversion.
pub fn convert(config: &PipelineConfig) -> Result<MergeStats> {
    convert_csv_file(&config.raw_csv_path, &config.converted_csv_path)?;
    clean_jsonl(&config.raw_jsonl_path, &config.cleaned_jsonl_path)?;

    let table = LabelTable::from_file(&config.converted_csv_path, &config.report_key_column)?;
    let records: Vec<Value> = read_jsonl(&config.cleaned_jsonl_path)?;
    let (merged, stats) = merge_with_labels(
        &records,
        &table,
        &config.report_name_field,
        config.num_labels,
    )?;
    write_jsonl(&config.merged_jsonl_path, &merged)?;

    let converted = write_jsonl(&config.final_jsonl, &convert_labels_to_int(merged))?;
    tracing::info!(
        records = converted,
        path = %config.final_jsonl.display(),
        "dataset ready"
    );
    Ok(stats)
}

/// Split the final JSONL into train and validation files.
pub fn dataset(config: &PipelineConfig) -> Result<(usize, usize)> {
    create_dataset(
        &config.final_jsonl,
        &config.hf_dataset,
        config.validation_fraction,
        config.split_seed,
    )
}

/// Load `tokenizer_file` with the configured special-token handling.
pub fn load_tokenizer(config: &PipelineConfig) -> Result<HfTokenizerBackend> {
    let Some(tokenizer_file) = &config.tokenizer_file else {
        bail!("tokenizer_file is not configured");
    };
    let backend = HfTokenizerBackend::from_file(tokenizer_file)?
        .with_special_tokens(config.add_special_tokens);
    match backend.pad_token_id() {
        Some(pad) if pad != config.pad_token_id => tracing::warn!(
            tokenizer = pad,
            configured = config.pad_token_id,
            "tokenizer pad id differs from configured pad_token_id"
        ),
        _ => {}
    }
    Ok(backend)
}

/// Chunk both splits with the configured tokenizer.
pub fn tokenize(config: &PipelineConfig) -> Result<TokenizeSummary> {
    let backend = load_tokenizer(config)?;
    let chunker = Chunker::new(config.chunker_config())?;
    tokenize_dataset(
        &config.hf_dataset,
        &config.tokenizer_output_path,
        &chunker,
        &backend,
        config.num_labels,
    )
}

/// Compute and log the label weight vector of the training chunks.
pub fn weights(config: &PipelineConfig, tracker: &mut dyn ExperimentTracker) -> Result<Vec<f64>> {
    let train = load_chunks(&config.tokenizer_output_path, Split::Train)?;
    let names = config.names()?;
    let weights = training_class_weights(
        &train,
        config.num_labels,
        &config.class_weight_method,
        config.class_weight_granularity,
        &names,
    )?;
    tracker.log_param("class_weight_method", &config.class_weight_method.to_string())?;
    tracker.log_class_weights(&weights, &names)?;
    Ok(weights)
}

/// Output of [`train`].
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub run_dir: PathBuf,
    pub class_weights: Vec<f64>,
    pub fit: FitSummary,
}

/// Train the baseline classifier on the tokenized splits and save it in
/// a fresh run directory under `model_output_path`.
pub fn train(config: &PipelineConfig, tracker: &mut dyn ExperimentTracker) -> Result<TrainOutcome> {
    let args = &config.training_args;
    tracker.log_param("model_name", &config.model_name)?;
    tracker.log_param("num_labels", &config.num_labels.to_string())?;
    tracker.log_param("learning_rate", &args.learning_rate.to_string())?;
    tracker.log_param("batch_size", &args.per_device_train_batch_size.to_string())?;
    tracker.log_param("num_epochs", &args.num_train_epochs.to_string())?;
    tracker.log_param("weight_decay", &args.weight_decay.to_string())?;
    tracker.log_param(
        "tokenizer_path",
        &config.tokenizer_output_path.display().to_string(),
    )?;

    let class_weights = weights(config, tracker)?;
    let train = load_chunks(&config.tokenizer_output_path, Split::Train)?;
    let validation = load_chunks(&config.tokenizer_output_path, Split::Validation)?;

    let device = Device::Cpu;
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = MeanPoolClassifier::new(
        vb,
        &ClassifierConfig {
            vocab_size: args.vocab_size,
            hidden_size: args.hidden_size,
            num_labels: config.num_labels,
        },
    )?;

    let mut trainer = Trainer::new(
        model,
        varmap,
        WeightedBceWithLogits,
        TrainerConfig::from(args),
        config.names()?,
        device,
    );
    let fit = trainer.fit(&train, &validation, &class_weights, tracker)?;
    if let Some(evaluation) = &fit.evaluation {
        tracker.log_report(&evaluation.report.prefixed("final_"), None)?;
    }

    let run_dir = run_directory(&config.model_output_path)?;
    trainer.save(&run_dir)?;
    let config_path = run_dir.join("training_config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(config)?)
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    tracker.log_param("model_output_path", &run_dir.display().to_string())?;

    tracing::info!(path = %run_dir.display(), "training completed");
    Ok(TrainOutcome {
        run_dir,
        class_weights,
        fit,
    })
}

fn run_directory(base: &Path) -> Result<PathBuf> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs();
    Ok(base.join(format!("esgtune-{secs}")))
}

/// One line of a predictions file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub labels: Vec<u8>,
    pub logits: Vec<f64>,
}

/// Tune thresholds and report metrics for stored model outputs.
pub fn evaluate_predictions(path: &Path, config: &PipelineConfig) -> Result<Evaluation> {
    let records: Vec<PredictionRecord> = read_jsonl(path)?;
    if records.is_empty() {
        bail!("no predictions in {}", path.display());
    }

    let labels: Vec<&[u8]> = records.iter().map(|r| r.labels.as_slice()).collect();
    let logits: Vec<&[f64]> = records.iter().map(|r| r.logits.as_slice()).collect();
    let truth = LabelMatrix::from_label_rows(&labels, config.num_labels)?;
    let logits = Matrix::from_rows(&logits, config.num_labels)?;

    Ok(evaluate_logits(&truth, &logits, &config.names()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::JsonlTracker;
    use esgtune_core::{RawDocument, TokenizerBackend};

    const WORD_LEVEL_TOKENIZER: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": {
            "type": "RobertaProcessing",
            "sep": ["</s>", 2],
            "cls": ["<s>", 0],
            "trim_offsets": false,
            "add_prefix_space": false
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "<s>": 0, "<pad>": 1, "</s>": 2, "<unk>": 3, "green": 4, "bond": 5 },
            "unk_token": "<unk>"
        }
    }"#;

    fn config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            num_labels: 2,
            label_names: vec!["E".into(), "S".into()],
            raw_csv_path: dir.join("raw/labels.csv"),
            raw_jsonl_path: dir.join("raw/reports.jsonl"),
            converted_csv_path: dir.join("interim/labels.csv"),
            cleaned_jsonl_path: dir.join("interim/clean.jsonl"),
            merged_jsonl_path: dir.join("interim/merged.jsonl"),
            final_jsonl: dir.join("processed/final.jsonl"),
            hf_dataset: dir.join("processed/dataset"),
            tokenizer_output_path: dir.join("processed/tokenized"),
            model_output_path: dir.join("models"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_convert_step() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(dir.path().join("raw")).unwrap();
        std::fs::write(&config.raw_csv_path, "Raport;E;S\nAlpha;1,0;0,0\n").unwrap();
        std::fs::write(
            &config.raw_jsonl_path,
            concat!(
                "{\"nazwa_raportu\": \"Alpha\", \"text\": \"Energy.... report\"}\n",
                "{\"nazwa_raportu\": \"X123\", \"text\": \"Other\"}\n",
            ),
        )
        .unwrap();

        let stats = convert(&config).unwrap();
        assert_eq!(stats, MergeStats { matched: 1, unmatched: 1 });

        let rows: Vec<RawDocument> = read_jsonl(&config.final_jsonl).unwrap();
        assert_eq!(
            rows,
            vec![
                RawDocument::new("Energy. report", Some(vec![1, 0])),
                RawDocument::new("Other", Some(vec![0, 0])),
            ]
        );
        assert!(config.merged_jsonl_path.exists());
    }

    #[test]
    fn test_tokenize_requires_tokenizer_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(tokenize(&config).is_err());
    }

    #[test]
    fn test_load_tokenizer_honours_special_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, WORD_LEVEL_TOKENIZER).unwrap();
        let mut config = config_in(dir.path());
        config.tokenizer_file = Some(path);

        let backend = load_tokenizer(&config).unwrap();
        assert_eq!(backend.pad_token_id(), Some(1));
        assert_eq!(backend.encode("green bond").unwrap(), vec![0, 4, 5, 2]);

        config.add_special_tokens = false;
        let backend = load_tokenizer(&config).unwrap();
        assert_eq!(backend.encode("green bond").unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_evaluate_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let logit = |p: f64| (p / (1.0 - p)).ln();
        let records: Vec<PredictionRecord> = [
            ([1u8, 0], [0.9, 0.1]),
            ([1, 0], [0.6, 0.2]),
            ([0, 1], [0.3, 0.8]),
            ([0, 1], [0.4, 0.7]),
        ]
        .iter()
        .map(|(y, p)| PredictionRecord {
            labels: y.to_vec(),
            logits: p.iter().map(|&v| logit(v)).collect(),
        })
        .collect();
        let path = dir.path().join("predictions.jsonl");
        write_jsonl(&path, &records).unwrap();

        let evaluation = evaluate_predictions(&path, &config).unwrap();
        assert_eq!(evaluation.report.get("f1_E"), Some(1.0));
        assert_eq!(evaluation.report.get("f1_S"), Some(1.0));
        assert!(evaluation.report.get("threshold_E").unwrap() <= 0.6);
    }

    #[test]
    fn test_evaluate_predictions_checks_width() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let path = dir.path().join("predictions.jsonl");
        write_jsonl(
            &path,
            &[PredictionRecord {
                labels: vec![1, 0, 1],
                logits: vec![0.0, 0.0, 0.0],
            }],
        )
        .unwrap();
        assert!(evaluate_predictions(&path, &config).is_err());
    }

    #[test]
    fn test_dataset_weights_and_train_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.max_length = 4;
        config.stride = 1;
        config.training_args.num_train_epochs = 2;
        config.training_args.vocab_size = 8;
        config.training_args.hidden_size = 4;

        let docs: Vec<RawDocument> = (0..10)
            .map(|i| RawDocument::new(format!("doc {i}"), Some(vec![i % 2, 1 - i % 2])))
            .collect();
        write_jsonl(&config.final_jsonl, &docs).unwrap();
        assert_eq!(dataset(&config).unwrap(), (8, 2));

        // stand-in for the tokenizer file: one token per whitespace word
        let backend =
            |text: &str| -> Vec<u32> { text.split_whitespace().map(|w| w.len() as u32).collect() };
        let chunker = Chunker::new(config.chunker_config()).unwrap();
        tokenize_dataset(
            &config.hf_dataset,
            &config.tokenizer_output_path,
            &chunker,
            &backend,
            2,
        )
        .unwrap();

        let log = dir.path().join("runs.jsonl");
        let mut tracker = JsonlTracker::open(&log).unwrap();
        let outcome = train(&config, &mut tracker).unwrap();

        assert_eq!(outcome.class_weights.len(), 2);
        assert_eq!(outcome.fit.epoch_losses.len(), 2);
        assert!(outcome.run_dir.join("model.safetensors").exists());
        assert!(outcome.run_dir.join("training_config.json").exists());

        let log = std::fs::read_to_string(&log).unwrap();
        assert!(log.contains("\"class_weight_E\""));
        assert!(log.contains("\"final_f1_macro\""));
    }
}
