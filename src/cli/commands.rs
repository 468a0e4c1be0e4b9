// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `test`, and their
// flags. Hyperparameters live in the YAML config; the CLI only
// points at files and patches individual keys.

use clap::{Args, Subcommand};

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Meta-train the negative-margin classifier
    Train(TrainArgs),

    /// Episodically evaluate a trained result directory
    Test(TestArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to the experiment YAML config
    #[arg(long, default_value = "config/negative_margin.yaml")]
    pub config: String,

    /// Override a config value, e.g. --set optim.lr=0.05
    /// (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Continue from the latest checkpoint in the result
    /// directory instead of starting fresh
    #[arg(long)]
    pub resume: bool,
}

/// All arguments for the `test` command.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Result directory written by `train` (holds the
    /// checkpoint and its resolved config)
    #[arg(long, default_value = "results/negmargin")]
    pub result_dir: String,

    /// Override a config value, e.g. --set episode.test_episode=2000
    /// (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}
