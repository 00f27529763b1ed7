// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`     — trains a model on a directory of .mid files
//   2. `generate`  — loads a checkpoint and writes a new piece
//   3. `visualize` — prints a piano roll of a .mid file
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use std::sync::atomic::AtomicBool;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, TrainArgs, VisualizeArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive.
#[derive(Parser, Debug)]
#[command(
    name = "cadenza",
    version = "0.1.0",
    about = "Train an LSTM or transformer music model on MIDI files, then generate new pieces."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use
    /// case. This keeps the CLI layer thin — it only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => Self::run_train(args),
            Commands::Generate(args)  => Self::run_generate(args),
            Commands::Visualize(args) => Self::run_visualize(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on MIDI files in: {}", args.midi_dir);

        // The trainer polls this between batches; the CLI has no
        // signal wiring, so it stays unset for the whole run
        let stop = AtomicBool::new(false);

        let use_case = TrainUseCase::new(args.into());
        use_case.execute(&stop)?;

        println!("Training complete. Checkpoint saved.");
        Ok(())
    }

    fn run_generate(args: GenerateArgs) -> Result<()> {
        use crate::application::generate_use_case::GenerateUseCase;

        let output = args.output.clone();
        let use_case = GenerateUseCase::new(args.try_into()?);
        let events = use_case.execute()?;

        println!("Wrote {events} events to {output}");
        Ok(())
    }

    fn run_visualize(args: VisualizeArgs) -> Result<()> {
        use crate::application::visualize_use_case::VisualizeUseCase;

        let use_case = VisualizeUseCase::new(args.input, args.ticks_per_step);
        for line in use_case.execute()? {
            println!("{line}");
        }
        Ok(())
    }
}
