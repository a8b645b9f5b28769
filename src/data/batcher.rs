// ============================================================
// Layer 4 - Audio Batcher
// ============================================================
// Implements Burn's Batcher trait: a Vec of sample pairs in,
// one pair of [batch, time, 1] tensors out.
//
//   pair 0:  x0_0 x0_1 ... x0_T      ┐
//   pair 1:  x1_0 x1_1 ... x1_T      ├─► inputs  [B, T, 1]
//   ...                              ┘
//   (same for targets)
//
// Every window in a batch must have the same length T; the
// dataset generator cuts fixed-size windows, so a mismatch
// means the dataset is broken and the batch becomes an error.
//
// Read errors from the dataset are passed straight through:
// the first failed item turns the whole batch into Err.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SampleResult;
use crate::domain::{
    error::{EngineError, EngineResult},
    sample::SamplePair,
};

/// A batch of aligned windows ready for the model.
#[derive(Debug, Clone)]
pub struct AudioBatch<B: Backend> {
    /// Dry signal - shape: [batch, time, 1]
    pub inputs: Tensor<B, 3>,

    /// Processed signal - shape: [batch, time, 1]
    pub targets: Tensor<B, 3>,
}

impl<B: Backend> AudioBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.inputs.dims()[0]
    }
}

pub type BatchResult<B> = EngineResult<AudioBatch<B>>;

#[derive(Clone, Debug)]
pub struct AudioBatcher<B: Backend> {
    /// Device the batch tensors are created on
    pub device: B::Device,
}

impl<B: Backend> AudioBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn try_batch(&self, items: Vec<SampleResult>) -> BatchResult<B> {
        let pairs = items.into_iter().collect::<EngineResult<Vec<_>>>()?;

        let batch_size = pairs.len();
        let seq_len    = pairs.first().map(|p| p.len()).ok_or_else(|| {
            EngineError::Shape("cannot build a batch from zero windows".to_string())
        })?;

        if pairs.iter().any(SamplePair::is_empty) {
            return Err(EngineError::Shape("windows must contain at least one sample".to_string()));
        }

        if let Some(bad) = pairs.iter().find(|p| p.len() != seq_len) {
            return Err(EngineError::Shape(format!(
                "window lengths differ inside one batch ({} vs {})",
                seq_len,
                bad.len()
            )));
        }

        let mut input_flat  = Vec::with_capacity(batch_size * seq_len);
        let mut target_flat = Vec::with_capacity(batch_size * seq_len);
        for pair in pairs {
            input_flat.extend(pair.input);
            target_flat.extend(pair.target);
        }

        let inputs = Tensor::<B, 3>::from_data(
            TensorData::new(input_flat, [batch_size, seq_len, 1]),
            &self.device,
        );
        let targets = Tensor::<B, 3>::from_data(
            TensorData::new(target_flat, [batch_size, seq_len, 1]),
            &self.device,
        );

        Ok(AudioBatch { inputs, targets })
    }
}

impl<B: Backend> Batcher<SampleResult, BatchResult<B>> for AudioBatcher<B> {
    fn batch(&self, items: Vec<SampleResult>) -> BatchResult<B> {
        self.try_batch(items)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn pair(len: usize, value: f32) -> SampleResult {
        SamplePair::new(vec![value; len], vec![-value; len])
    }

    #[test]
    fn test_batch_shape_is_batch_time_one() {
        let batcher = AudioBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![pair(16, 0.1), pair(16, 0.2), pair(16, 0.3)]).unwrap();

        assert_eq!(batch.inputs.dims(),  [3, 16, 1]);
        assert_eq!(batch.targets.dims(), [3, 16, 1]);
        assert_eq!(batch.batch_size(), 3);

        let row1: Vec<f32> = batch.inputs.narrow(0, 1, 1).into_data().to_vec().unwrap();
        assert!(row1.iter().all(|&v| (v - 0.2).abs() < 1e-7));
    }

    #[test]
    fn test_uneven_windows_are_shape_error() {
        let batcher = AudioBatcher::<TestBackend>::new(Default::default());
        let result  = batcher.batch(vec![pair(16, 0.1), pair(15, 0.2)]);
        assert!(matches!(result, Err(EngineError::Shape(_))));
    }

    #[test]
    fn test_item_error_propagates() {
        let batcher = AudioBatcher::<TestBackend>::new(Default::default());
        let missing = Err(EngineError::Io {
            path:    "target2.wav".into(),
            message: "file not found".to_string(),
        });
        let result = batcher.batch(vec![pair(8, 0.1), missing]);
        assert!(matches!(result, Err(EngineError::Io { .. })));
    }
}
