// ============================================================
// Layer 5 - Reduce-on-Plateau Learning Rate
// ============================================================
// Burn's built-in LR schedulers are driven by the step count
// only. Amp models keep improving slowly for hundreds of
// epochs, so the rate is instead cut when the validation loss
// stops improving:
//
//   every epoch:
//     loss < best * (1 - threshold)  → new best, reset counter
//     otherwise                      → counter += 1
//     counter > patience             → lr *= factor, counter = 0
//
// Non-finite losses are ignored rather than counted, so one
// NaN epoch can't knock the rate down on its own.
//
// Reference: Smith (2017) "Cyclical Learning Rates", §3.3

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateauConfig {
    /// Epochs without improvement tolerated before a cut
    pub patience:  usize,
    /// Multiplier applied on each cut
    pub factor:    f64,
    /// Relative improvement that counts as "better"
    pub threshold: f64,
    /// Floor for the learning rate
    pub min_lr:    f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self { patience: 10, factor: 0.1, threshold: 1e-4, min_lr: 0.0 }
    }
}

#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    config:      PlateauConfig,
    lr:          f64,
    best:        f64,
    bad_epochs:  usize,
}

impl PlateauScheduler {
    pub fn new(initial_lr: f64, config: PlateauConfig) -> Self {
        Self { config, lr: initial_lr, best: f64::INFINITY, bad_epochs: 0 }
    }

    /// Rate to use for the next optimiser steps
    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Feed one epoch's validation loss. Returns the new rate if it was cut.
    pub fn step(&mut self, val_loss: f64) -> Option<f64> {
        if !val_loss.is_finite() {
            tracing::warn!("Validation loss is not finite; learning rate left at {:.3e}", self.lr);
            return None;
        }

        if val_loss < self.best * (1.0 - self.config.threshold) {
            self.best       = val_loss;
            self.bad_epochs = 0;
            return None;
        }

        self.bad_epochs += 1;
        if self.bad_epochs <= self.config.patience {
            return None;
        }

        self.bad_epochs = 0;
        let reduced = (self.lr * self.config.factor).max(self.config.min_lr);
        if reduced >= self.lr {
            return None;
        }

        tracing::info!(
            "Validation loss plateaued at {:.6}; learning rate {:.3e} → {:.3e}",
            self.best,
            self.lr,
            reduced
        );
        self.lr = reduced;
        Some(reduced)
    }
}
