//! Training loop for chunk classifiers with an injected loss strategy.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};

use esgtune_core::{
    Chunk, ChunkSet, ClassWeightMethod, Evaluation, LabelNames, LossStrategy, Matrix,
    compute_class_weights, evaluate_logits, pos_weight_tensor,
};

use crate::config::{TrainingArgs, WeightGranularity};
use crate::model::ChunkClassifier;
use crate::tracker::ExperimentTracker;

/// File name of saved model weights inside the output directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Label weight vector for the training split at the chosen granularity.
pub fn training_class_weights(
    train: &ChunkSet,
    num_labels: usize,
    method: &ClassWeightMethod,
    granularity: WeightGranularity,
    names: &LabelNames,
) -> Result<Vec<f64>> {
    let labels = match granularity {
        WeightGranularity::Chunk => train.label_matrix(num_labels)?,
        WeightGranularity::Document => train.document_label_matrix(num_labels)?,
    };
    tracing::info!(
        method = %method,
        granularity = ?granularity,
        rows = labels.rows(),
        "calculating class weights"
    );
    Ok(compute_class_weights(&labels, method, names))
}

/// Optimizer settings for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub seed: u64,
}

impl From<&TrainingArgs> for TrainerConfig {
    fn from(args: &TrainingArgs) -> Self {
        Self {
            learning_rate: args.learning_rate,
            weight_decay: args.weight_decay,
            batch_size: args.per_device_train_batch_size,
            epochs: args.num_train_epochs,
            seed: args.seed,
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct FitSummary {
    /// Mean training loss per epoch.
    pub epoch_losses: Vec<f64>,
    /// Validation evaluation after the last epoch, if there was a
    /// validation split.
    pub evaluation: Option<Evaluation>,
}

pub struct Trainer<M, L> {
    model: M,
    varmap: VarMap,
    loss: L,
    config: TrainerConfig,
    names: LabelNames,
    device: Device,
}

impl<M: ChunkClassifier, L: LossStrategy> Trainer<M, L> {
    /// `varmap` must hold the trainable variables of `model`.
    pub fn new(
        model: M,
        varmap: VarMap,
        loss: L,
        config: TrainerConfig,
        names: LabelNames,
        device: Device,
    ) -> Self {
        Self {
            model,
            varmap,
            loss,
            config,
            names,
            device,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Train for the configured number of epochs, evaluating on
    /// `validation` after each one.
    pub fn fit(
        &mut self,
        train: &ChunkSet,
        validation: &ChunkSet,
        class_weights: &[f64],
        tracker: &mut dyn ExperimentTracker,
    ) -> Result<FitSummary> {
        if train.is_empty() {
            bail!("training split has no chunks");
        }
        if self.config.batch_size == 0 {
            bail!("batch size must be at least 1");
        }
        let num_labels = self.model.num_labels();
        if class_weights.len() != num_labels {
            bail!(
                "{} class weights for {} labels",
                class_weights.len(),
                num_labels
            );
        }

        let pos_weight = pos_weight_tensor(class_weights, &self.device)?;
        let params = ParamsAdamW {
            lr: self.config.learning_rate,
            weight_decay: self.config.weight_decay,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(self.varmap.all_vars(), params)?;
        let mut rng = oorandom::Rand64::new(u128::from(self.config.seed));

        tracing::info!(
            chunks = train.len(),
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            "starting training"
        );

        let mut summary = FitSummary {
            epoch_losses: Vec::with_capacity(self.config.epochs),
            evaluation: None,
        };

        for epoch in 1..=self.config.epochs {
            let mut order: Vec<usize> = (0..train.len()).collect();
            for i in (1..order.len()).rev() {
                let j = rng.rand_range(0..(i as u64 + 1)) as usize;
                order.swap(i, j);
            }

            let mut total = 0.0f64;
            let mut batches = 0usize;
            for (step, indices) in order.chunks(self.config.batch_size).enumerate() {
                let batch: Vec<&Chunk> = indices.iter().map(|&i| &train.chunks()[i]).collect();
                let (input_ids, attention_mask) = self.inputs(&batch)?;
                let labels = self.targets(&batch, num_labels)?;

                let logits = self.model.forward(&input_ids, &attention_mask)?;
                let loss = self.loss.loss(&logits, &labels, &pos_weight)?;
                optimizer.backward_step(&loss)?;

                let value = f64::from(loss.to_scalar::<f32>()?);
                tracing::debug!(epoch, step, loss = value, "batch");
                total += value;
                batches += 1;
            }

            let epoch_loss = total / batches.max(1) as f64;
            tracker.log_metric("loss", epoch_loss, Some(epoch))?;
            tracing::info!(epoch, loss = epoch_loss, "epoch complete");
            summary.epoch_losses.push(epoch_loss);

            if !validation.is_empty() {
                let evaluation = self.evaluate(validation)?;
                tracker.log_report(&evaluation.report.prefixed("eval_"), Some(epoch))?;
                summary.evaluation = Some(evaluation);
            }
        }

        Ok(summary)
    }

    /// Raw logits for every chunk, in chunk order.
    pub fn predict_logits(&self, chunks: &ChunkSet) -> Result<Matrix<f64>> {
        let num_labels = self.model.num_labels();
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(chunks.len());
        let batch_size = self.config.batch_size.max(1);

        for batch in chunks.chunks().chunks(batch_size) {
            let batch: Vec<&Chunk> = batch.iter().collect();
            let (input_ids, attention_mask) = self.inputs(&batch)?;
            let logits = self
                .model
                .forward(&input_ids, &attention_mask)?
                .to_dtype(DType::F64)?;
            rows.extend(logits.to_vec2::<f64>()?);
        }

        Ok(Matrix::from_rows(&rows, num_labels)?)
    }

    /// Tune thresholds and report metrics on `chunks`.
    pub fn evaluate(&self, chunks: &ChunkSet) -> Result<Evaluation> {
        let truth = chunks.label_matrix(self.model.num_labels())?;
        let logits = self.predict_logits(chunks)?;
        Ok(evaluate_logits(&truth, &logits, &self.names)?)
    }

    /// Write the trained variables as safetensors under `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(WEIGHTS_FILE);
        self.varmap
            .save(&path)
            .with_context(|| format!("failed to save weights to {}", path.display()))?;
        tracing::info!(path = %path.display(), "model saved");
        Ok(path)
    }

    fn inputs(&self, batch: &[&Chunk]) -> Result<(Tensor, Tensor)> {
        let seq_len = batch.first().map_or(0, |c| c.token_ids.len());
        let mut ids = Vec::with_capacity(batch.len() * seq_len);
        let mut mask = Vec::with_capacity(batch.len() * seq_len);
        for chunk in batch {
            if chunk.token_ids.len() != seq_len || chunk.attention_mask.len() != seq_len {
                bail!(
                    "chunk of document {} has length {}, expected {seq_len}",
                    chunk.doc_id,
                    chunk.token_ids.len()
                );
            }
            ids.extend_from_slice(&chunk.token_ids);
            mask.extend_from_slice(&chunk.attention_mask);
        }

        let shape = (batch.len(), seq_len);
        Ok((
            Tensor::from_vec(ids, shape, &self.device)?,
            Tensor::from_vec(mask, shape, &self.device)?,
        ))
    }

    fn targets(&self, batch: &[&Chunk], num_labels: usize) -> Result<Tensor> {
        let mut values = Vec::with_capacity(batch.len() * num_labels);
        for chunk in batch {
            if chunk.labels.len() != num_labels {
                bail!(
                    "chunk of document {} has {} labels, expected {num_labels}",
                    chunk.doc_id,
                    chunk.labels.len()
                );
            }
            values.extend(chunk.labels.iter().map(|&v| f32::from(v)));
        }
        Ok(Tensor::from_vec(
            values,
            (batch.len(), num_labels),
            &self.device,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassifierConfig, MeanPoolClassifier};
    use candle_nn::VarBuilder;
    use esgtune_core::{Split, WeightedBceWithLogits};

    struct NullTracker {
        metrics: Vec<(String, Option<usize>)>,
    }

    impl ExperimentTracker for NullTracker {
        fn log_param(&mut self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }

        fn log_metric(&mut self, key: &str, _value: f64, step: Option<usize>) -> Result<()> {
            self.metrics.push((key.to_string(), step));
            Ok(())
        }
    }

    fn chunk(doc_id: usize, token: u32, labels: [u8; 2], split: Split) -> Chunk {
        Chunk {
            token_ids: vec![token, token, 0, 0],
            attention_mask: vec![1, 1, 0, 0],
            doc_id,
            labels: labels.to_vec(),
            split,
        }
    }

    /// Token 1 always means label 0, token 2 always means label 1.
    fn separable(split: Split, offset: usize) -> ChunkSet {
        (0..8)
            .map(|i| {
                if i % 2 == 0 {
                    chunk(offset + i, 1, [1, 0], split)
                } else {
                    chunk(offset + i, 2, [0, 1], split)
                }
            })
            .collect()
    }

    fn trainer(epochs: usize) -> Trainer<MeanPoolClassifier, WeightedBceWithLogits> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = MeanPoolClassifier::new(
            vb,
            &ClassifierConfig {
                vocab_size: 4,
                hidden_size: 8,
                num_labels: 2,
            },
        )
        .unwrap();
        let config = TrainerConfig {
            learning_rate: 0.05,
            weight_decay: 0.0,
            batch_size: 4,
            epochs,
            seed: 42,
        };
        Trainer::new(
            model,
            varmap,
            WeightedBceWithLogits,
            config,
            LabelNames::positional(),
            device,
        )
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut trainer = trainer(30);
        let train = separable(Split::Train, 0);
        let validation = separable(Split::Validation, 100);
        let mut tracker = NullTracker { metrics: Vec::new() };

        let summary = trainer
            .fit(&train, &validation, &[1.0, 1.0], &mut tracker)
            .unwrap();

        assert_eq!(summary.epoch_losses.len(), 30);
        let first = summary.epoch_losses[0];
        let last = summary.epoch_losses[29];
        assert!(last < first, "loss went from {first} to {last}");

        let evaluation = summary.evaluation.unwrap();
        assert_eq!(evaluation.search.len(), 2);
        assert!(evaluation.report.get("f1_macro").is_some());
        assert!(
            tracker
                .metrics
                .iter()
                .any(|(k, step)| k == "eval_f1_macro" && *step == Some(30))
        );
    }

    #[test]
    fn test_predict_logits_shape() {
        let trainer = trainer(1);
        let chunks = separable(Split::Validation, 0);
        let logits = trainer.predict_logits(&chunks).unwrap();
        assert_eq!(logits.shape(), (8, 2));
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let mut trainer = trainer(1);
        let mut tracker = NullTracker { metrics: Vec::new() };
        let empty = ChunkSet::default();
        assert!(trainer.fit(&empty, &empty, &[1.0, 1.0], &mut tracker).is_err());

        let train = separable(Split::Train, 0);
        assert!(trainer.fit(&train, &empty, &[1.0], &mut tracker).is_err());
    }

    #[test]
    fn test_save_writes_safetensors() {
        let trainer = trainer(1);
        let dir = tempfile::tempdir().unwrap();
        let path = trainer.save(&dir.path().join("run")).unwrap();
        assert!(path.ends_with(WEIGHTS_FILE));
        assert!(path.exists());
    }

    #[test]
    fn test_class_weight_granularity() {
        // doc 0 has three chunks, doc 1 has one
        let train: ChunkSet = [
            chunk(0, 1, [1, 0], Split::Train),
            chunk(0, 1, [1, 0], Split::Train),
            chunk(0, 1, [1, 0], Split::Train),
            chunk(1, 2, [0, 1], Split::Train),
        ]
        .into_iter()
        .collect();
        let names = LabelNames::positional();

        let per_chunk = training_class_weights(
            &train,
            2,
            &ClassWeightMethod::Balanced,
            WeightGranularity::Chunk,
            &names,
        )
        .unwrap();
        assert_eq!(per_chunk, vec![4.0 / 6.0, 2.0]);

        let per_document = training_class_weights(
            &train,
            2,
            &ClassWeightMethod::Balanced,
            WeightGranularity::Document,
            &names,
        )
        .unwrap();
        assert_eq!(per_document, vec![1.0, 1.0]);
    }
}
