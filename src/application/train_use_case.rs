// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Derive the run name          (type + timestamp)
//   Step 2: Index train/ and val/        (Layer 4 - data)
//   Step 3: Pick the backend             (Layer 6 - infra)
//   Step 4: Build or resume the model    (Layer 5 - ml)
//   Step 5: Save config next to metrics  (Layer 6 - infra)
//   Step 6: Attach optimizer, run epochs (Layer 5 - ml)
//   Step 7: Save the final model         (Layer 6 - infra)
//   Step 8: Report the validation losses (Layer 5 - ml)
//
// Dataset layout expected under data_dir:
//
//   data_dir/
//     train/  input0.wav target0.wav ...
//     val/    input0.wav target0.wav ...
//
// Reference: Burn Book §5 (Training)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::dataset::AudioDataset;
use crate::domain::{
    device::ComputeDevice,
    error::{EngineError, EngineResult},
};
use crate::infra::{
    checkpoint::{CheckpointStore, AUTOSAVE_FILE},
    device::{with_backend, BackendTask},
    metrics::EpochMetrics,
};
use crate::ml::{
    loss::{LossBreakdown, LossMode},
    scheduler::PlateauConfig,
    trainer::{Trainer, TrainerConfig},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Serialisable so every run leaves a record of how it was trained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model_type:    String,
    pub data_dir:      PathBuf,
    pub out_dir:       PathBuf,
    pub runs_dir:      PathBuf,
    pub autosave_path: PathBuf,
    pub epochs:        usize,
    pub batch_size:    usize,
    pub lr:            f64,
    pub num_workers:   usize,
    pub shuffle_seed:  u64,
    pub loss_mode:     LossMode,
    pub device:        ComputeDevice,
    /// Checkpoint to continue from instead of fresh weights
    #[serde(default)]
    pub resume:        Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model_type:    "lstm-32-1".to_string(),
            data_dir:      PathBuf::from("dataset"),
            out_dir:       PathBuf::from("out"),
            runs_dir:      PathBuf::from("runs"),
            autosave_path: PathBuf::from(AUTOSAVE_FILE),
            epochs:        1000,
            batch_size:    32,
            lr:            3e-4,
            num_workers:   1,
            shuffle_seed:  42,
            loss_mode:     LossMode::Combined,
            device:        ComputeDevice::Auto,
            resume:        None,
        }
    }
}

impl TrainConfig {
    fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            batch_size:    self.batch_size,
            num_workers:   self.num_workers,
            shuffle_seed:  self.shuffle_seed,
            loss_mode:     self.loss_mode,
            runs_dir:      self.runs_dir.clone(),
            autosave_path: self.autosave_path.clone(),
            plateau:       PlateauConfig::default(),
        }
    }
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub run_name:   String,
    pub model_path: PathBuf,
    /// Directory holding metrics.csv and train_config.json
    pub run_dir:    PathBuf,
    pub history:    Vec<EpochMetrics>,
    /// Validation loss terms of the final weights
    pub breakdown:  LossBreakdown,
}

/// `<model_type>_<YYYYmmdd_HHMM>`
pub fn run_name(model_type: &str) -> String {
    format!("{}_{}", model_type, chrono::Local::now().format("%Y%m%d_%H%M"))
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 1: Run name ──────────────────────────────────────────────────
        let run_name = run_name(&cfg.model_type);
        tracing::info!("Starting run '{}'", run_name);

        // ── Step 2: Index both dataset directories ────────────────────────────
        let train_dataset = AudioDataset::new(cfg.data_dir.join("train"))
            .context("Cannot open training set")?;
        let val_dataset = AudioDataset::new(cfg.data_dir.join("val"))
            .context("Cannot open validation set")?;

        // ── Steps 3-7: Everything backend-specific ────────────────────────────
        let task = TrainTask { config: cfg.clone(), run_name, train_dataset, val_dataset };
        let report = with_backend(cfg.device, task)??;

        Ok(report)
    }
}

struct TrainTask {
    config:        TrainConfig,
    run_name:      String,
    train_dataset: AudioDataset,
    val_dataset:   AudioDataset,
}

impl BackendTask for TrainTask {
    type Output = EngineResult<TrainReport>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output {
        let cfg   = &self.config;
        let store = CheckpointStore::new();

        let trainer = Trainer::<B>::new(cfg.trainer_config(), self.train_dataset, self.val_dataset, device);
        let mut ready = trainer.create_model(&cfg.model_type, &self.run_name)?;
        if let Some(path) = &cfg.resume {
            tracing::info!("Resuming from '{}'", path.display());
            let requested = ready.model_type();
            ready = ready.load_model(path)?;
            if ready.model_type() != requested {
                return Err(EngineError::checkpoint(
                    path,
                    format!("holds a {} model, run asked for {}", ready.model_type(), requested),
                ));
            }
        }

        store.save_config(cfg, &ready.metrics().run_dir().join("train_config.json"))?;

        let mut session = ready.create_optimizer(cfg.lr);
        let history     = session.fit(cfg.epochs)?;

        let model_path = final_model_path(&cfg.out_dir, &self.run_name);
        session.save_model(&model_path)?;
        tracing::info!(
            "Saved final model to '{}' after {} epochs",
            model_path.display(),
            session.current_epoch(),
        );

        let breakdown = session.loss_metrics()?;
        let run_dir   = session.metrics().run_dir().to_path_buf();
        Ok(TrainReport { run_name: self.run_name, model_path, run_dir, history, breakdown })
    }
}

fn final_model_path(out_dir: &Path, run_name: &str) -> PathBuf {
    out_dir.join(format!("model_{run_name}.ckpt"))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::write_sine_pairs;

    #[test]
    fn test_run_name_starts_with_type() {
        let name = run_name("gru-8-2");
        assert!(name.starts_with("gru-8-2_"));
        // _YYYYmmdd_HHMM
        assert_eq!(name.len(), "gru-8-2".len() + 14);
    }

    #[test]
    fn test_execute_trains_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        for split in ["train", "val"] {
            std::fs::create_dir_all(data.join(split)).unwrap();
            write_sine_pairs(&data.join(split), 2, 128);
        }

        let cfg = TrainConfig {
            model_type:    "rnn-4-1".to_string(),
            data_dir:      data,
            out_dir:       dir.path().join("out"),
            runs_dir:      dir.path().join("runs"),
            autosave_path: dir.path().join("autosave.ckpt"),
            epochs:        1,
            batch_size:    2,
            device:        ComputeDevice::Cpu,
            ..TrainConfig::default()
        };

        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(report.history.len(), 1);
        assert!(report.model_path.exists());
        assert!(cfg.autosave_path.exists());
        assert_eq!(report.run_dir, cfg.runs_dir.join(&report.run_name));
        assert!(report.run_dir.join("train_config.json").exists());
        assert!(report.run_dir.join("metrics.csv").exists());
        let b = report.breakdown;
        assert!(b.combined.is_finite());
        assert!((b.combined - (b.magnitude + b.spectral)).abs() < 1e-6);
    }

    #[test]
    fn test_resume_continues_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        for split in ["train", "val"] {
            std::fs::create_dir_all(data.join(split)).unwrap();
            write_sine_pairs(&data.join(split), 2, 128);
        }

        let base = TrainConfig {
            model_type:    "gru-4-1".to_string(),
            data_dir:      data,
            out_dir:       dir.path().join("out"),
            runs_dir:      dir.path().join("runs"),
            autosave_path: dir.path().join("autosave.ckpt"),
            epochs:        1,
            batch_size:    2,
            device:        ComputeDevice::Cpu,
            ..TrainConfig::default()
        };
        let first = TrainUseCase::new(base.clone()).execute().unwrap();

        let resumed = TrainConfig { resume: Some(first.model_path.clone()), ..base.clone() };
        let second = TrainUseCase::new(resumed).execute().unwrap();
        assert_eq!(second.history.len(), 1);
        assert!(second.model_path.exists());

        // A checkpoint of another shape cannot seed this run
        let wrong = TrainConfig {
            model_type: "lstm-4-1".to_string(),
            resume:     Some(first.model_path),
            ..base
        };
        assert!(TrainUseCase::new(wrong).execute().is_err());
    }

    #[test]
    fn test_missing_validation_set_fails_before_training() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("train")).unwrap();
        write_sine_pairs(&dir.path().join("train"), 2, 32);

        let cfg = TrainConfig {
            data_dir: dir.path().to_path_buf(),
            runs_dir: dir.path().join("runs"),
            device:   ComputeDevice::Cpu,
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
        assert!(!dir.path().join("runs").exists());
    }
}
