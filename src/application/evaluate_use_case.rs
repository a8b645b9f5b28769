// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Scores a saved checkpoint against a directory of input/target
// pairs and reports every loss term separately:
//
//   magnitude  mean |output - target|
//   spectral   STFT spectral convergence + log-magnitude
//   combined   magnitude + spectral
//
// Runs on the plain backend; no gradients are tracked.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::data::dataloader::DataLoaderBuilder;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{batcher::AudioBatcher, dataset::AudioDataset};
use crate::domain::{device::ComputeDevice, error::EngineResult};
use crate::infra::{
    checkpoint::CheckpointStore,
    device::{with_backend, BackendTask},
};
use crate::ml::{
    loss::{LossBreakdown, LossComposer, LossMode},
    trainer::evaluate_loader,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    pub model_path:  PathBuf,
    pub data_dir:    PathBuf,
    pub batch_size:  usize,
    pub num_workers: usize,
    pub device:      ComputeDevice,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            model_path:  PathBuf::from("autosave.ckpt"),
            data_dir:    PathBuf::from("dataset/val"),
            batch_size:  32,
            num_workers: 1,
            device:      ComputeDevice::Auto,
        }
    }
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<LossBreakdown> {
        let cfg = &self.config;

        let dataset = AudioDataset::new(&cfg.data_dir)
            .with_context(|| format!("Cannot open '{}'", cfg.data_dir.display()))?;
        tracing::info!("Evaluating on {} pairs from '{}'", dataset.sample_count(), cfg.data_dir.display());

        let task = EvaluateTask { config: cfg.clone(), dataset };
        let breakdown = with_backend(cfg.device, task)??;

        tracing::info!(
            "magnitude={:.6} spectral={:.6} combined={:.6}",
            breakdown.magnitude, breakdown.spectral, breakdown.combined
        );
        Ok(breakdown)
    }
}

struct EvaluateTask {
    config:  EvaluateConfig,
    dataset: AudioDataset,
}

impl BackendTask for EvaluateTask {
    type Output = EngineResult<LossBreakdown>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output {
        let cfg   = &self.config;
        let model = CheckpointStore::new().load::<B::InnerBackend>(&cfg.model_path, &device)?;

        let loader = DataLoaderBuilder::new(AudioBatcher::<B::InnerBackend>::new(device))
            .batch_size(cfg.batch_size.max(1))
            .num_workers(cfg.num_workers.max(1))
            .build(self.dataset);

        evaluate_loader(&model, &loader, &LossComposer::new(LossMode::Combined))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::write_sine_pairs;
    use crate::ml::model::AmpModelConfig;

    fn fixture(dir: &std::path::Path) -> EvaluateConfig {
        let data = dir.join("val");
        std::fs::create_dir_all(&data).unwrap();
        write_sine_pairs(&data, 3, 64);

        let ckpt  = dir.join("model.ckpt");
        let model = AmpModelConfig::new("rnn-3-1".parse().unwrap())
            .init::<burn::backend::NdArray>(&Default::default());
        CheckpointStore::new().save(&model, &ckpt).unwrap();

        EvaluateConfig {
            model_path: ckpt,
            data_dir:   data,
            batch_size: 2,
            device:     ComputeDevice::Cpu,
            ..EvaluateConfig::default()
        }
    }

    #[test]
    fn test_breakdown_terms_are_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let b   = EvaluateUseCase::new(fixture(dir.path())).execute().unwrap();

        assert!(b.magnitude.is_finite() && b.magnitude >= 0.0);
        assert!(b.spectral.is_finite() && b.spectral >= 0.0);
        assert!((b.combined - (b.magnitude + b.spectral)).abs() < 1e-4);
    }

    #[test]
    fn test_missing_data_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EvaluateConfig {
            data_dir: dir.path().join("absent"),
            ..fixture(dir.path())
        };
        assert!(EvaluateUseCase::new(cfg).execute().is_err());
    }
}
