// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `predict` and
// `evaluate`, and all their configurable flags.
//
// clap's derive macros generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f32, ComputeDevice, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::{
    evaluate_use_case::EvaluateConfig,
    predict_use_case::PredictConfig,
    train_use_case::TrainConfig,
};
use crate::data::loader::MODEL_SAMPLE_RATE;
use crate::domain::device::ComputeDevice;
use crate::infra::checkpoint::AUTOSAVE_FILE;
use crate::ml::loss::LossMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a recurrent model on input/target WAV pairs
    Train(TrainArgs),

    /// Render an audio file through a trained model
    Predict(PredictArgs),

    /// Report the loss terms of a trained model on a dataset
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Model type as <cell>-<hidden_size>-<num_layers>, cell is rnn, gru or lstm
    #[arg(long, default_value = "lstm-32-1")]
    pub model_type: String,

    /// Dataset root holding train/ and val/ subdirectories
    #[arg(long, default_value = "dataset")]
    pub data_dir: PathBuf,

    /// Where the final model is written
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,

    /// Parent directory of per-run metrics
    #[arg(long, default_value = "runs")]
    pub runs_dir: PathBuf,

    /// Checkpoint overwritten after every epoch
    #[arg(long, default_value = AUTOSAVE_FILE)]
    pub autosave: PathBuf,

    #[arg(long, default_value_t = 1000)]
    pub epochs: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Initial Adam learning rate; the plateau controller lowers it
    #[arg(long, default_value_t = 3e-4)]
    pub lr: f64,

    /// Threads building batches in the background
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// magnitude (l1), spectral (stft) or combined (both)
    #[arg(long, default_value_t = LossMode::Combined)]
    pub loss: LossMode,

    /// auto, cpu or gpu
    #[arg(long, default_value_t = ComputeDevice::Auto)]
    pub device: ComputeDevice,

    /// Continue from this checkpoint; its model type must match --model-type
    #[arg(long)]
    pub resume: Option<PathBuf>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            model_type:    a.model_type,
            data_dir:      a.data_dir,
            out_dir:       a.out_dir,
            runs_dir:      a.runs_dir,
            autosave_path: a.autosave,
            epochs:        a.epochs,
            batch_size:    a.batch_size,
            lr:            a.lr,
            num_workers:   a.num_workers,
            shuffle_seed:  a.seed,
            loss_mode:     a.loss,
            device:        a.device,
            resume:        a.resume,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Checkpoint to load
    #[arg(long)]
    pub model: PathBuf,

    /// Audio file to process; downmixed to mono and resampled as needed
    #[arg(long)]
    pub audio: PathBuf,

    /// Gain before the model, in dB
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub in_gain: f32,

    /// Gain after the model, in dB
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub out_gain: f32,

    /// First sample to process
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// One past the last sample to process
    #[arg(long)]
    pub end: Option<usize>,

    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long, default_value_t = ComputeDevice::Auto)]
    pub device: ComputeDevice,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            model_path:  a.model,
            audio_path:  a.audio,
            out_dir:     a.out_dir,
            in_gain_db:  a.in_gain,
            out_gain_db: a.out_gain,
            start:       a.start,
            end:         a.end,
            device:      a.device,
            sample_rate: MODEL_SAMPLE_RATE,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub model: PathBuf,

    /// Directory of input{N}.wav / target{N}.wav pairs
    #[arg(long)]
    pub data_dir: PathBuf,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, default_value_t = ComputeDevice::Auto)]
    pub device: ComputeDevice,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            model_path:  a.model,
            data_dir:    a.data_dir,
            batch_size:  a.batch_size,
            num_workers: a.num_workers,
            device:      a.device,
        }
    }
}
