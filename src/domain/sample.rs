// ============================================================
// Layer 3 - SamplePair Domain Type
// ============================================================
// One training window: the dry signal that went into the
// effect and the processed signal that came out, sample for
// sample. Both are mono and normalised to [-1, 1].
//
//   input[t]  ──[ amp / pedal ]──►  target[t]
//
// The pair is only valid when both sides have the same length,
// so the constructor is the single place that checks it.

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePair {
    /// Unprocessed waveform
    pub input: Vec<f32>,

    /// Waveform after the effect being emulated
    pub target: Vec<f32>,
}

impl SamplePair {
    /// Build a pair, rejecting mismatched lengths.
    pub fn new(input: Vec<f32>, target: Vec<f32>) -> Result<Self, EngineError> {
        if input.len() != target.len() {
            return Err(EngineError::Shape(format!(
                "input has {} samples but target has {}",
                input.len(),
                target.len()
            )));
        }
        Ok(Self { input, target })
    }

    /// Number of time steps in the window
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }
}
