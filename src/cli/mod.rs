// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and hands everything else to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    - fit a model on a train/ + val/ dataset
//   2. `predict`  - render a WAV file through a checkpoint
//   3. `evaluate` - print the loss terms of a checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};

use crate::application::{
    evaluate_use_case::EvaluateUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
};
use crate::ml::loss::LossBreakdown;

#[derive(Parser, Debug)]
#[command(
    name = "amp-modeler",
    version,
    about = "Learn the sound of an amp or pedal from input/target recordings, then render audio through it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the matching use case. Nothing is computed here.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Training {} on '{}'", args.model_type, args.data_dir.display());

    let report = TrainUseCase::new(args.into()).execute()?;

    println!("Run {} finished after {} epochs", report.run_name, report.history.len());
    if let Some(last) = report.history.last() {
        println!("final val_loss: {:.6}", last.val_loss);
    }
    print_breakdown(&report.breakdown);
    println!("Metrics in {}", report.run_dir.display());
    println!("Training complete. Model saved to {}", report.model_path.display());
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let written = PredictUseCase::new(args.into()).execute()?;
    println!("Wrote {}", written.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let b = EvaluateUseCase::new(args.into()).execute()?;
    print_breakdown(&b);
    Ok(())
}

fn print_breakdown(b: &LossBreakdown) {
    println!("magnitude: {:.6}", b.magnitude);
    println!("spectral:  {:.6}", b.spectral);
    println!("combined:  {:.6}", b.combined);
}
