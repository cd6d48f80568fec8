//! Saffron CLI - batch recipe enrichment with an LLM.
//!
//! Reads a JSON file of recipes, asks a language model for derived metadata
//! (health and difficulty scores, timings, dietary tags), validates every
//! response, and writes one checkpoint per batch so interrupted runs resume
//! where they stopped.
//!
//! # Usage
//!
//! ```bash
//! # Enrich recipes.json into ./enriched_recipes (the default command)
//! saffron
//!
//! # Explicit input, smaller batches, a different model
//! saffron run --input recipes.json --batch-size 5 --model gpt-4o-mini
//!
//! # Combine existing checkpoints without calling the model
//! saffron aggregate --partial
//!
//! # View configuration
//! saffron config show
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use saffron_core::Config;

mod cli;
mod logging;

/// Saffron - batch recipe enrichment with retries and resumable checkpoints.
#[derive(Parser, Debug)]
#[command(name = "saffron")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "SAFFRON_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Command to run (defaults to `run`)
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Enrich recipes batch by batch, resuming from existing checkpoints
    Run(cli::run::RunArgs),

    /// Combine batch checkpoints into the final output file
    Aggregate(cli::aggregate::AggregateArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),

    /// Manage the enrichment result cache
    Cache(cli::cache::CacheArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config problems go to stderr directly.
    let config = Config::load_layered(cli.config.as_deref());
    let fallback = Config::default();
    let log_config = match &config {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Check your config file with `saffron config path`."
            );
            &fallback
        }
    };
    logging::init_from_config(log_config, cli.verbose, cli.json_logs);

    tracing::debug!("Saffron v{}", saffron_core::VERSION);

    match cli.command {
        None => cli::run::execute(cli::run::RunArgs::default(), config?).await,
        Some(Commands::Run(args)) => cli::run::execute(args, config?).await,
        Some(Commands::Aggregate(args)) => cli::aggregate::execute(args, config?),
        Some(Commands::Config(args)) => cli::config::execute(args, cli.config, config),
        Some(Commands::Cache(args)) => cli::cache::execute(args, config?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["saffron"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "saffron",
            "run",
            "--input",
            "in.json",
            "--batch-size",
            "5",
            "--provider",
            "ollama",
            "--no-cache",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.input, Some(PathBuf::from("in.json")));
                assert_eq!(args.batch_size, Some(5));
                assert!(args.no_cache);
                assert!(!args.partial);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["saffron", "aggregate", "--partial", "--config", "x.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Aggregate(ref args)) if args.partial
        ));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(Cli::try_parse_from(["saffron", "run", "--provider", "mystery"]).is_err());
    }
}
