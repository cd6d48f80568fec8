//! Saffron Core - batch recipe enrichment library.
//!
//! Saffron annotates recipes with model-derived metadata (health and
//! difficulty scores, timings, dietary tags) and writes the results as JSON,
//! one checkpoint per batch so an interrupted run can resume.
//!
//! # Architecture
//!
//! ```text
//! recipes.json → Batch Runner → Retry Policy → LLM Provider → Schema Validator
//!                     ↓
//!               checkpoint per batch → Aggregator → enriched_recipes_final.json
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use saffron_core::{input, BatchRunner, CheckpointStore, Config, Enricher, EnrichOptions};
//! use saffron_core::llm::LlmProviderFactory;
//!
//! #[tokio::main]
//! async fn main() -> saffron_core::Result<()> {
//!     let config = Config::load()?;
//!     let recipes = input::load_recipes(&config.input_file())?;
//!     let provider = LlmProviderFactory::create(&config.llm)?;
//!     let enricher = Enricher::new(provider, EnrichOptions::from_config(&config)?);
//!     let store = CheckpointStore::open(config.output_dir(), config.output.pretty)?;
//!     let runner = BatchRunner::new(enricher, store, config.run_options(false));
//!
//!     let report = runner.run(&recipes).await?;
//!     println!("{} enriched, {} failed", report.succeeded, report.failed);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod output;
pub mod schema;
pub mod types;

pub use batch::{BatchRunner, CheckpointStore, FinalOutput, Progress, RunOptions, RunReport};
pub use cache::RecipeCache;
pub use config::Config;
pub use error::{ConfigError, EnrichError, Result, SaffronError, ValidationError};
pub use llm::{EnrichOptions, EnrichResult, Enricher};
pub use types::{EnrichedRecipe, EnrichmentResult, FailureRecord, Recipe};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
