// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application); this layer
// only routes and prints results.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::{
    evaluate_use_case::{EvaluateConfig, EvaluateUseCase, EvaluationOutcome},
    train_use_case::TrainUseCase,
};

#[derive(Parser, Debug)]
#[command(
    name = "embedding-classifier",
    version,
    about = "Train linear or feed-forward classifiers on cached document embeddings."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Run(args)      => {
                let eval = EvaluateConfig::from(&args);
                run_train(args)?;
                print_outcome(&EvaluateUseCase::new(eval).execute()?);
                Ok(())
            }
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Starting training on bundle: {}", args.bundle.display());
    let summary = TrainUseCase::new(args.into()).execute()?;
    println!(
        "Training complete at global step {}. Checkpoint saved in '{}'.",
        summary.global_step,
        summary.model.checkpoint_dir().display()
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let outcome = EvaluateUseCase::new(args.into()).execute()?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &EvaluationOutcome) {
    println!("\nEvaluation: {}", outcome.result);
    if let Some(report) = &outcome.report {
        println!("\n{report}");
    }
}
