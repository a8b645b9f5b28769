// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records per-epoch scalars for one training run to a CSV file
// so learning curves can be plotted afterwards.
//
// Each run gets its own directory, named after the run:
//
//   runs/
//     lstm-32-1_20261018_1412/
//       metrics.csv
//       train_config.json
//
// The CSV is a flat stream of scalar events:
//
//   step,tag,value
//   0,train_loss,0.912345
//   0,val_loss,0.887001
//   0,learning_rate,0.000300
//   1,train_loss,...
//
// How to read the metrics:
//   - train_loss and val_loss should both fall
//   - val_loss rising while train_loss falls → overfitting
//   - learning_rate steps down when val_loss plateaus
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::domain::error::{EngineError, EngineResult};

pub const TAG_TRAIN_LOSS: &str = "train_loss";
pub const TAG_VAL_LOSS:   &str = "val_loss";
pub const TAG_LR:         &str = "learning_rate";

/// Everything recorded about one finished epoch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Zero-based epoch number
    pub epoch: usize,

    /// Average combined loss over all training batches
    pub train_loss: f64,

    /// Average combined loss over the validation set
    pub val_loss: f64,

    /// Learning rate that was used during this epoch
    pub learning_rate: f64,
}

/// Appends scalar events to `<runs_dir>/<run_name>/metrics.csv`.
#[derive(Debug)]
pub struct MetricsLogger {
    run_dir:  PathBuf,
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open (or continue) the metrics stream for `run_name`.
    pub fn open(runs_dir: &Path, run_name: &str) -> EngineResult<Self> {
        let run_dir = runs_dir.join(run_name);
        fs::create_dir_all(&run_dir).map_err(|e| EngineError::io(&run_dir, e))?;

        let csv_path = run_dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path).map_err(|e| EngineError::io(&csv_path, e))?;
            writeln!(f, "step,tag,value").map_err(|e| EngineError::io(&csv_path, e))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { run_dir, csv_path })
    }

    /// Append one scalar.
    pub fn log_scalar(&self, tag: &str, step: usize, value: f64) -> EngineResult<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| EngineError::io(&self.csv_path, e))?;

        writeln!(f, "{step},{tag},{value}").map_err(|e| EngineError::io(&self.csv_path, e))
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[cfg(test)]
impl MetricsLogger {
    /// Read the stream back as (step, tag, value) rows.
    pub fn read_scalars(&self) -> EngineResult<Vec<(usize, String, f64)>> {
        let text = fs::read_to_string(&self.csv_path).map_err(|e| EngineError::io(&self.csv_path, e))?;

        let mut rows = Vec::new();
        for line in text.lines().skip(1).filter(|l| !l.trim().is_empty()) {
            let mut parts = line.splitn(3, ',');
            let parsed = (|| {
                let step  = parts.next()?.parse().ok()?;
                let tag   = parts.next()?.to_string();
                let value = parts.next()?.parse().ok()?;
                Some((step, tag, value))
            })();
            let row = parsed.ok_or_else(|| {
                EngineError::io(&self.csv_path, format!("malformed metrics row '{line}'"))
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_are_appended_in_order() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::open(dir.path(), "gru-8-1_test").unwrap();

        logger.log_scalar(TAG_TRAIN_LOSS, 0, 0.5).unwrap();
        logger.log_scalar(TAG_VAL_LOSS,   0, 0.25).unwrap();

        let rows = logger.read_scalars().unwrap();
        assert_eq!(rows, vec![
            (0, TAG_TRAIN_LOSS.to_string(), 0.5),
            (0, TAG_VAL_LOSS.to_string(),   0.25),
        ]);
        assert!(logger.run_dir().ends_with("gru-8-1_test"));
    }

    #[test]
    fn test_reopening_continues_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::open(dir.path(), "run").unwrap().log_scalar(TAG_LR, 0, 1e-3).unwrap();

        let logger = MetricsLogger::open(dir.path(), "run").unwrap();
        logger.log_scalar(TAG_LR, 1, 1e-4).unwrap();
        assert_eq!(logger.read_scalars().unwrap().len(), 2);
    }
}
