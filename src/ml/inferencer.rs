// ============================================================
// Layer 5 - Predictor
// ============================================================
// Runs a trained model over a whole waveform in one shot:
//
//   audio[start..end]  →  [1, len, 1]  →  model  →  [1, len, 1]  →  Vec<f32>
//
// No batching and no chunking: the requested span is one
// sequence, so the recurrent state flows through the entire
// recording exactly as it would in a real effect.
//
// The predictor is generic over a plain (non-autodiff) backend;
// nothing here tracks gradients. Gain staging is NOT done here,
// see application::predict_use_case.

use std::path::Path;

use burn::prelude::*;

use crate::domain::{
    error::{EngineError, EngineResult},
    model_type::ModelType,
};
use crate::infra::checkpoint::CheckpointStore;
use crate::ml::model::AmpModel;

pub struct Predictor<B: Backend> {
    model:  AmpModel<B>,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    pub fn new(model: AmpModel<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    pub fn from_checkpoint(path: &Path, device: B::Device) -> EngineResult<Self> {
        let model = CheckpointStore::new().load::<B>(path, &device)?;
        Ok(Self::new(model, device))
    }

    pub fn model_type(&self) -> ModelType {
        self.model.model_type()
    }

    /// Process `audio[start..end]` (to the end when `end` is None).
    pub fn predict(&self, audio: &[f32], start: usize, end: Option<usize>) -> EngineResult<Vec<f32>> {
        let end = end.unwrap_or(audio.len());
        if start >= end || end > audio.len() {
            return Err(EngineError::Shape(format!(
                "cannot predict span {start}..{end} of a {}-sample signal",
                audio.len()
            )));
        }

        let span = audio[start..end].to_vec();
        let len  = span.len();
        let input = Tensor::<B, 3>::from_data(TensorData::new(span, [1, len, 1]), &self.device);

        let output = self.model.forward(input);
        let samples = output
            .reshape([len])
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| EngineError::Shape(format!("model output is not readable as f32: {e:?}")))?;

        tracing::debug!("Predicted {} samples with {}", len, self.model_type());
        Ok(samples)
    }
}
