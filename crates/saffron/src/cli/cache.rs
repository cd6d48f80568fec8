//! The `saffron cache` command.

use std::process::ExitCode;

use clap::{Args, Subcommand};
use saffron_core::{Config, RecipeCache};

/// Arguments for the `cache` command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Delete every cached enrichment result
    Clear,
}

pub fn execute(args: CacheArgs, config: Config) -> anyhow::Result<ExitCode> {
    match args.command {
        CacheCommand::Clear => {
            let dir = config.cache_dir();
            let removed = RecipeCache::clear(&dir)?;
            println!("Removed {removed} cached result(s) from {}", dir.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}
