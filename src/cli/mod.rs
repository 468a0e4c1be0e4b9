// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — meta-trains on the configured feature splits
//   2. `test`  — evaluates a result directory episodically

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TestArgs, TrainArgs};

use crate::infra::config::{parse_override_args, Config};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "negmargin",
    version = "0.1.0",
    about = "Few-shot classification with a negative-margin cosine classifier."
)]
pub struct Cli {
    /// The subcommand to run (train or test)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use
    /// case. The CLI layer only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Test(args) => Self::run_test(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Loading config from '{}'", args.config);
        let overrides = parse_override_args(&args.set)?;
        let config = Config::from_yaml_with_overrides(&args.config, &overrides)?;

        let use_case = TrainUseCase::new(config, args.resume);
        use_case.execute()?;

        println!("Training complete. Checkpoints saved.");
        Ok(())
    }

    fn run_test(args: TestArgs) -> Result<()> {
        use crate::application::test_use_case::TestUseCase;

        let overrides = parse_override_args(&args.set)?;
        let use_case = TestUseCase::new(args.result_dir.clone(), &overrides)?;
        use_case.execute()?;
        Ok(())
    }
}
