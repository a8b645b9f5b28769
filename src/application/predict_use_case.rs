// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Renders a WAV file through a trained checkpoint:
//
//   Step 1: Load audio, downmix, resample to 48 kHz  (Layer 4)
//   Step 2: Restore the model from its checkpoint    (Layer 6)
//   Step 3: in-gain  →  model  →  out-gain           (Layer 3 + 5)
//   Step 4: Write predict_<timestamp>.wav            (Layer 4)
//
// Gain is specified in decibels and applied as a linear factor
// 10^(dB/20). +20 dB multiplies by 10, -6 dB roughly halves.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::loader::{load_for_inference, write_mono_wav, MODEL_SAMPLE_RATE};
use crate::domain::{device::ComputeDevice, error::EngineResult, gain::apply_gain_db};
use crate::infra::device::{with_backend, BackendTask};
use crate::ml::inferencer::Predictor;

// ─── Prediction Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub model_path:  PathBuf,
    pub audio_path:  PathBuf,
    pub out_dir:     PathBuf,
    pub in_gain_db:  f32,
    pub out_gain_db: f32,
    pub start:       usize,
    pub end:         Option<usize>,
    pub device:      ComputeDevice,
    pub sample_rate: u32,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            model_path:  PathBuf::from("autosave.ckpt"),
            audio_path:  PathBuf::from("input.wav"),
            out_dir:     PathBuf::from("."),
            in_gain_db:  0.0,
            out_gain_db: 0.0,
            start:       0,
            end:         None,
            device:      ComputeDevice::Auto,
            sample_rate: MODEL_SAMPLE_RATE,
        }
    }
}

/// Apply input gain, run the model over `[start, end)`, apply output gain.
pub fn render<B: Backend>(
    predictor:   &Predictor<B>,
    audio:       &[f32],
    in_gain_db:  f32,
    out_gain_db: f32,
    start:       usize,
    end:         Option<usize>,
) -> EngineResult<Vec<f32>> {
    let mut driven = audio.to_vec();
    apply_gain_db(&mut driven, in_gain_db);

    let mut output = predictor.predict(&driven, start, end)?;
    apply_gain_db(&mut output, out_gain_db);
    Ok(output)
}

// ─── PredictUseCase ───────────────────────────────────────────────────────────
pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    /// Returns the path of the written WAV file.
    pub fn execute(&self) -> Result<PathBuf> {
        let cfg = &self.config;

        // ── Step 1: Audio ─────────────────────────────────────────────────────
        let audio = load_for_inference(&cfg.audio_path, cfg.sample_rate)
            .with_context(|| format!("Cannot load '{}'", cfg.audio_path.display()))?;
        tracing::info!("Loaded {} samples from '{}'", audio.len(), cfg.audio_path.display());

        // ── Steps 2-3: Model + gain staging ───────────────────────────────────
        let task   = PredictTask { config: cfg.clone(), audio };
        let output = with_backend(cfg.device, task)??;

        // ── Step 4: Write result ──────────────────────────────────────────────
        let file = format!("predict_{}.wav", chrono::Local::now().format("%Y%m%d_%H%M"));
        let path = cfg.out_dir.join(file);
        std::fs::create_dir_all(&cfg.out_dir)
            .with_context(|| format!("Cannot create '{}'", cfg.out_dir.display()))?;
        write_mono_wav(&path, &output, cfg.sample_rate)?;

        tracing::info!("Wrote {} samples to '{}'", output.len(), path.display());
        Ok(path)
    }
}

struct PredictTask {
    config: PredictConfig,
    audio:  Vec<f32>,
}

impl BackendTask for PredictTask {
    type Output = EngineResult<Vec<f32>>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output {
        let cfg = &self.config;
        let predictor = Predictor::<B::InnerBackend>::from_checkpoint(&cfg.model_path, device)?;
        tracing::info!("Restored {} from '{}'", predictor.model_type(), cfg.model_path.display());

        render(&predictor, &self.audio, cfg.in_gain_db, cfg.out_gain_db, cfg.start, cfg.end)
    }
}
