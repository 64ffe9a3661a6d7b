//! # Loss Strategies
//!
//! The training loop receives its loss as a strategy object instead of
//! hard-coding it, so class weighting is a property of the injected loss.

use candle_core::{DType, Device, Tensor};

use crate::error::Result;

/// Computes a scalar loss from logits, targets and per-label positive weights.
pub trait LossStrategy {
    /// `logits` and `labels` are `[batch, num_labels]`; `pos_weight` is
    /// `[num_labels]`. Returns a scalar tensor.
    fn loss(&self, logits: &Tensor, labels: &Tensor, pos_weight: &Tensor) -> Result<Tensor>;
}

/// Binary cross-entropy on logits with a positive-class weight per label,
/// averaged over every cell.
///
/// Per cell: `(1 - y) * x + (1 + (w - 1) * y) * (ln(1 + e^-|x|) + max(-x, 0))`.
/// Each label's logit is scored independently (multi-label).
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedBceWithLogits;

impl LossStrategy for WeightedBceWithLogits {
    fn loss(&self, logits: &Tensor, labels: &Tensor, pos_weight: &Tensor) -> Result<Tensor> {
        let labels = labels.to_dtype(logits.dtype())?;
        let pos_weight = pos_weight.to_dtype(logits.dtype())?;

        // ln(1 + e^-|x|) + max(-x, 0), stable for large |x|
        let softplus_neg = logits
            .abs()?
            .neg()?
            .exp()?
            .affine(1.0, 1.0)?
            .log()?
            .add(&logits.neg()?.relu()?)?;

        let log_weight = labels
            .broadcast_mul(&pos_weight.affine(1.0, -1.0)?)?
            .affine(1.0, 1.0)?;

        let negative_term = labels.affine(-1.0, 1.0)?.mul(logits)?;
        let loss = negative_term.add(&log_weight.mul(&softplus_neg)?)?;

        Ok(loss.mean_all()?)
    }
}

/// Turn a label weight vector into a `[num_labels]` f32 tensor.
pub fn pos_weight_tensor(weights: &[f64], device: &Device) -> Result<Tensor> {
    let values: Vec<f32> = weights.iter().map(|&w| w as f32).collect();
    Ok(Tensor::new(values.as_slice(), device)?.to_dtype(DType::F32)?)
}
