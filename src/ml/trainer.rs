// ============================================================
// Layer 5 - Training Loop
// ============================================================
// The trainer is a small state machine. Each phase is its own
// type, so calling things in the wrong order doesn't compile:
//
//   Trainer          datasets + loaders, no model yet
//     │ create_model(type, run_name)
//     ▼
//   ModelReady       model on device, metrics stream open
//     │ create_optimizer(lr)
//     ▼
//   TrainingSession  Adam + plateau LR; train/validate/fit
//
// One epoch in fit():
//
//   train_step     forward → loss → backward → clip → Adam step
//   validate_step  forward only, on the non-autodiff backend
//   plateau LR     fed the epoch's validation loss
//   autosave       unconditional, atomic overwrite
//
// Key burn details:
//   - Training batches are built on B (Autodiff<...>), the
//     validation batches on B::InnerBackend, because
//     model.valid() returns the model on the inner backend.
//   - Gradients are fresh for every backward() call, there is
//     nothing to zero between steps.
//   - Gradient clipping happens between backward() and the
//     Adam step, on the global norm of all gradients (≤ 70).
//
// Reference: Burn Book §5 (Training), Kingma & Ba (2015) Adam

use std::{path::{Path, PathBuf}, sync::Arc};

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::{AudioBatcher, BatchResult},
    dataset::AudioDataset,
};
use crate::domain::{error::EngineResult, model_type::ModelType};
use crate::infra::{
    checkpoint::{CheckpointStore, AUTOSAVE_FILE},
    metrics::{EpochMetrics, MetricsLogger, TAG_LR, TAG_TRAIN_LOSS, TAG_VAL_LOSS},
};
use crate::ml::{
    grad_clip::clip_global_norm,
    loss::{LossBreakdown, LossComposer, LossMode},
    model::{AmpModel, AmpModelConfig},
    scheduler::{PlateauConfig, PlateauScheduler},
};

/// Gradient norm ceiling for recurrent unrolling
pub const MAX_GRAD_NORM: f64 = 70.0;

/// Loop settings that don't belong to the model itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub batch_size:    usize,
    pub num_workers:   usize,
    pub shuffle_seed:  u64,
    pub loss_mode:     LossMode,
    /// Parent directory of every run's metrics stream
    pub runs_dir:      PathBuf,
    /// Overwritten after every epoch
    pub autosave_path: PathBuf,
    pub plateau:       PlateauConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            batch_size:    32,
            num_workers:   1,
            shuffle_seed:  42,
            loss_mode:     LossMode::Combined,
            runs_dir:      PathBuf::from("runs"),
            autosave_path: PathBuf::from(AUTOSAVE_FILE),
            plateau:       PlateauConfig::default(),
        }
    }
}

// ─── Phase 1: Trainer ─────────────────────────────────────────────────────────
pub struct Trainer<B: AutodiffBackend> {
    config:       TrainerConfig,
    device:       B::Device,
    train_loader: Arc<dyn DataLoader<BatchResult<B>>>,
    val_loader:   Arc<dyn DataLoader<BatchResult<B::InnerBackend>>>,
    loss:         LossComposer,
    store:        CheckpointStore,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(
        config:        TrainerConfig,
        train_dataset: AudioDataset,
        val_dataset:   AudioDataset,
        device:        B::Device,
    ) -> Self {
        let batch_size = config.batch_size.max(1);

        let train_loader = DataLoaderBuilder::new(AudioBatcher::<B>::new(device.clone()))
            .batch_size(batch_size)
            .shuffle(config.shuffle_seed)
            .num_workers(config.num_workers.max(1))
            .build(train_dataset);

        let val_loader = DataLoaderBuilder::new(AudioBatcher::<B::InnerBackend>::new(device.clone()))
            .batch_size(batch_size)
            .num_workers(config.num_workers.max(1))
            .build(val_dataset);

        let loss = LossComposer::new(config.loss_mode);

        Self { config, device, train_loader, val_loader, loss, store: CheckpointStore::new() }
    }

    /// Build the model named by `descriptor` and open the run's metrics stream.
    ///
    /// The descriptor is validated before anything touches the disk, so a bad
    /// type leaves no run directory behind.
    pub fn create_model(self, descriptor: &str, run_name: &str) -> EngineResult<ModelReady<B>> {
        let model_type: ModelType = descriptor.parse()?;

        let model   = AmpModelConfig::new(model_type).init::<B>(&self.device);
        let metrics = MetricsLogger::open(&self.config.runs_dir, run_name)?;

        tracing::info!(
            "Model ready: {} ({} parameters), metrics → '{}'",
            model_type,
            model.num_params(),
            metrics.csv_path().display()
        );
        Ok(ModelReady { trainer: self, model, metrics })
    }
}

// ─── Phase 2: ModelReady ──────────────────────────────────────────────────────
pub struct ModelReady<B: AutodiffBackend> {
    trainer: Trainer<B>,
    model:   AmpModel<B>,
    metrics: MetricsLogger,
}

impl<B: AutodiffBackend> ModelReady<B> {
    #[cfg(test)]
    pub fn model(&self) -> &AmpModel<B> {
        &self.model
    }

    pub fn metrics(&self) -> &MetricsLogger {
        &self.metrics
    }

    pub fn model_type(&self) -> ModelType {
        self.model.model_type()
    }

    /// Replace the current model with one loaded from `path`.
    /// The old model is dropped first so both never sit on the device together.
    pub fn load_model(self, path: &Path) -> EngineResult<Self> {
        let ModelReady { trainer, model, metrics } = self;
        drop(model);

        let model = trainer.store.load::<B>(path, &trainer.device)?;
        Ok(ModelReady { trainer, model, metrics })
    }

    /// Attach Adam and the plateau LR controller.
    pub fn create_optimizer(self, learning_rate: f64) -> TrainingSession<B, impl Optimizer<AmpModel<B>, B>> {
        let optim = AdamConfig::new().init::<B, AmpModel<B>>();

        let scheduler = PlateauScheduler::new(learning_rate, self.trainer.config.plateau.clone());
        tracing::info!("Optimizer ready: Adam, lr={:.3e}", learning_rate);

        TrainingSession {
            trainer: self.trainer,
            model:   self.model,
            metrics: self.metrics,
            optim,
            scheduler,
            epoch:   0,
        }
    }
}

// ─── Phase 3: TrainingSession ─────────────────────────────────────────────────
pub struct TrainingSession<B: AutodiffBackend, O: Optimizer<AmpModel<B>, B>> {
    trainer:   Trainer<B>,
    model:     AmpModel<B>,
    metrics:   MetricsLogger,
    optim:     O,
    scheduler: PlateauScheduler,
    /// Next epoch to run
    epoch:     usize,
}

impl<B, O> TrainingSession<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<AmpModel<B>, B>,
{
    #[cfg(test)]
    pub fn model(&self) -> &AmpModel<B> {
        &self.model
    }

    pub fn metrics(&self) -> &MetricsLogger {
        &self.metrics
    }

    pub fn current_epoch(&self) -> usize {
        self.epoch
    }

    pub fn learning_rate(&self) -> f64 {
        self.scheduler.lr()
    }

    pub fn save_model(&self, path: &Path) -> EngineResult<()> {
        self.trainer.store.save(&self.model, path)
    }

    /// One pass over the training set. Returns the average batch loss.
    pub fn train_step(&mut self, epoch: usize) -> EngineResult<f64> {
        let lr    = self.scheduler.lr();
        let total = self.trainer.train_loader.num_items();

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut seen     = 0usize;

        for batch in self.trainer.train_loader.iter() {
            let batch = batch?;
            seen += batch.batch_size();

            let output = self.model.forward(batch.inputs);
            let loss   = self.trainer.loss.forward(output, batch.targets);

            let loss_val: f64 = loss.clone().into_scalar().elem();
            loss_sum += loss_val;
            batches  += 1;

            let mut grads = GradientsParams::from_grads(loss.backward(), &self.model);
            let grad_norm = clip_global_norm::<B, _>(&self.model, &mut grads, MAX_GRAD_NORM);
            self.model = self.optim.step(lr, self.model.clone(), grads);

            tracing::debug!("loss: {:>9.6}  grad norm: {:>9.3}  [{:>5}/{:>5}]", loss_val, grad_norm, seen, total);
        }

        let avg = average(loss_sum, batches);
        self.metrics.log_scalar(TAG_TRAIN_LOSS, epoch, avg)?;
        Ok(avg)
    }

    /// One forward-only pass over the validation set. Returns the average batch loss.
    pub fn validate_step(&mut self, epoch: usize) -> EngineResult<f64> {
        let model_valid = self.model.valid();

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in self.trainer.val_loader.iter() {
            let batch  = batch?;
            let output = model_valid.forward(batch.inputs);
            let loss_val: f64 = self.trainer.loss.forward(output, batch.targets).into_scalar().elem();
            loss_sum += loss_val;
            batches  += 1;
        }

        // Release the inference copy before the next training pass
        drop(model_valid);

        let avg = average(loss_sum, batches);
        self.metrics.log_scalar(TAG_VAL_LOSS, epoch, avg)?;
        Ok(avg)
    }

    /// Average magnitude, spectral and combined loss over the validation set.
    pub fn loss_metrics(&self) -> EngineResult<LossBreakdown> {
        evaluate_loader(&self.model.valid(), &self.trainer.val_loader, &self.trainer.loss)
    }

    /// Run `epochs` more epochs, autosaving after each one.
    pub fn fit(&mut self, epochs: usize) -> EngineResult<Vec<EpochMetrics>> {
        let autosave = self.trainer.config.autosave_path.clone();
        let last     = self.epoch + epochs;
        let mut history = Vec::with_capacity(epochs);

        while self.epoch < last {
            let epoch = self.epoch;
            let lr    = self.learning_rate();
            println!("Epoch {}/{}\n-------------------------------", epoch + 1, last);

            let train_loss = self.train_step(epoch)?;
            let val_loss   = self.validate_step(epoch)?;
            self.metrics.log_scalar(TAG_LR, epoch, lr)?;
            self.scheduler.step(val_loss);

            self.save_model(&autosave)?;
            tracing::debug!("Autosaved epoch {} to '{}'", epoch + 1, autosave.display());

            println!(
                "Epoch {:>4}/{} | train_loss={:.6} | val_loss={:.6} | lr={:.3e}",
                epoch + 1, last, train_loss, val_loss, lr,
            );

            history.push(EpochMetrics { epoch, train_loss, val_loss, learning_rate: lr });
            self.epoch += 1;
        }

        tracing::info!(
            "Training complete after {} epochs, best val_loss={:.6}",
            self.epoch,
            self.scheduler.best()
        );
        Ok(history)
    }
}

/// Average the three loss terms of `model` over every batch of `loader`.
pub fn evaluate_loader<B: Backend>(
    model:  &AmpModel<B>,
    loader: &Arc<dyn DataLoader<BatchResult<B>>>,
    loss:   &LossComposer,
) -> EngineResult<LossBreakdown> {
    let mut sum     = LossBreakdown::default();
    let mut batches = 0usize;

    for batch in loader.iter() {
        let batch = batch?;
        let b = loss.breakdown(model.forward(batch.inputs), batch.targets);
        sum.magnitude += b.magnitude;
        sum.spectral  += b.spectral;
        sum.combined  += b.combined;
        batches += 1;
    }

    Ok(LossBreakdown {
        magnitude: average(sum.magnitude, batches),
        spectral:  average(sum.spectral,  batches),
        combined:  average(sum.combined,  batches),
    })
}

fn average(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}
