// ============================================================
// Layer 3 - Engine Errors
// ============================================================
// Every failure the engine can raise, grouped by the kind of
// contract that was broken. All of them are fatal: nothing in
// the engine retries, the error travels up to the CLI which
// prints the full chain and exits.
//
//   InvalidModelType  bad "<cell>-<hidden>-<layers>" string
//   EmptyDataset      no parseable target{N}.wav in a folder
//   DatasetIndex      index outside [0, N)
//   Io / Audio        missing, unreadable or corrupt file
//   Shape             lengths or ranks that don't line up
//   Checkpoint        checkpoint file can't be (de)serialised
//   Device / Config   unusable runtime configuration
//
// The enum is Clone so batch results can travel through
// burn's DataLoader, which requires Clone items.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("invalid model type '{descriptor}': {reason}")]
    InvalidModelType { descriptor: String, reason: String },

    #[error("no indexed sample files found in '{}'", dir.display())]
    EmptyDataset { dir: PathBuf },

    #[error("sample index {index} is out of range for a dataset of {len} pairs")]
    DatasetIndex { index: usize, len: usize },

    #[error("I/O error on '{}': {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("cannot decode audio '{}': {message}", path.display())]
    Audio { path: PathBuf, message: String },

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("checkpoint '{}' is unusable: {message}", path.display())]
    Checkpoint { path: PathBuf, message: String },

    #[error("compute device unavailable: {0}")]
    Device(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Io { path: path.to_path_buf(), message: err.to_string() }
    }

    pub fn audio(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Audio { path: path.to_path_buf(), message: err.to_string() }
    }

    pub fn checkpoint(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Checkpoint { path: path.to_path_buf(), message: err.to_string() }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
