//! CLI module for Counsel
//!
//! Provides command-line interface parsing for the counsel-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::types::RunMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Counsel - deep web research with a counsel of analysts
#[derive(Parser, Debug)]
#[command(
    name = "counsel-server",
    version,
    about = "Counsel - deep web research with a counsel of analysts",
    long_about = "Crawls the web around a topic, synthesizes what it reads with a local\n\
                  Ollama model and optionally lets a counsel of analysts interpret,\n\
                  vote on and synthesize the findings.",
    after_help = "EXAMPLES:\n    \
                  counsel-server run \"solar power\" --model llama3.2\n    \
                  counsel-server run \"gene therapy\" --mode counsel --members 4\n    \
                  counsel-server models\n    \
                  counsel-server config --validate"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "counsel.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a topic and print the results
    Run(RunArgs),

    /// List models offered by the inference backend
    Models,

    /// Show the effective configuration
    Config {
        /// Only validate, print nothing on success
        #[arg(long)]
        validate: bool,
    },
}

/// Arguments for `counsel-server run`
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Topic to research
    pub topic: String,

    /// Model name (defaults to inference.default_model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Pipeline to run: single or counsel
    #[arg(long, default_value = "single")]
    pub mode: RunMode,

    /// Number of counsel members (counsel mode)
    #[arg(short = 'n', long)]
    pub members: Option<usize>,

    /// Override crawl.max_depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Override crawl.max_pages
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Fixed voting seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the completed run as JSON to this file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "counsel-server",
            "run",
            "solar power",
            "--mode",
            "counsel",
            "-n",
            "4",
            "--max-depth",
            "1",
            "--seed",
            "7",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.topic, "solar power");
                assert_eq!(args.mode, RunMode::Counsel);
                assert_eq!(args.members, Some(4));
                assert_eq!(args.max_depth, Some(1));
                assert_eq!(args.seed, Some(7));
                assert!(args.model.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("counsel.toml"));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let parsed = Cli::try_parse_from(["counsel-server", "run", "x", "--mode", "debate"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["counsel-server", "models", "--no-color", "-c", "alt.toml"])
            .unwrap();
        assert!(cli.no_color);
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert!(matches!(cli.command, Commands::Models));
    }
}
