//! Chunk classifiers producing one logit per label.

use candle_core::{D, DType, Result, Tensor};
use candle_nn::{Embedding, Linear, Module, VarBuilder};

/// A model mapping token windows to per-label logits.
///
/// Implementations must return raw logits; the logistic transform is
/// applied downstream.
pub trait ChunkClassifier {
    /// `input_ids`: `[batch, seq_len]` u32, `attention_mask`: `[batch, seq_len]`.
    /// Returns `[batch, num_labels]`.
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor>;

    fn num_labels(&self) -> usize;
}

/// Shape of a [`MeanPoolClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_labels: usize,
}

/// Token embedding, masked mean pooling and a linear head.
pub struct MeanPoolClassifier {
    embeddings: Embedding,
    classifier: Linear,
    num_labels: usize,
}

impl MeanPoolClassifier {
    pub fn new(vb: VarBuilder, config: &ClassifierConfig) -> Result<Self> {
        let embeddings =
            candle_nn::embedding(config.vocab_size, config.hidden_size, vb.pp("embeddings"))?;
        let classifier =
            candle_nn::linear(config.hidden_size, config.num_labels, vb.pp("classifier"))?;
        Ok(Self {
            embeddings,
            classifier,
            num_labels: config.num_labels,
        })
    }
}

impl ChunkClassifier for MeanPoolClassifier {
    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let hidden = self.embeddings.forward(input_ids)?;

        // [batch, seq_len, 1]
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(D::Minus1)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        // all-padding windows would divide by zero
        let counts = mask.sum(1)?.clamp(1f32, f32::MAX)?;
        let pooled = summed.broadcast_div(&counts)?;

        self.classifier.forward(&pooled)
    }

    fn num_labels(&self) -> usize {
        self.num_labels
    }
}
