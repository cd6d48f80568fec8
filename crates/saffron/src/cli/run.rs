//! The `saffron run` command: enrich, checkpoint, aggregate.

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use saffron_core::batch::{BatchRunner, CheckpointStore, Progress};
use saffron_core::llm::{EnrichOptions, Enricher, LlmProviderFactory};
use saffron_core::{input, Config, RecipeCache};

use super::summary::print_run_summary;
use super::types::Provider;

/// Arguments for the `run` command. Unset options fall back to config.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Recipe input file (JSON array or a single recipe object)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory for checkpoints, the final file, and the failure log
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Recipes per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Recipes enriched concurrently within a batch
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// LLM provider
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Model name (provider-specific)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ignore the result cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Write the final file even if the run is cancelled part-way
    #[arg(long)]
    pub partial: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(input) = &self.input {
            config.general.input_file = input.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.general.output_dir = dir.clone();
        }
        if let Some(n) = self.batch_size {
            config.batch.batch_size = n;
        }
        if let Some(n) = self.parallel {
            config.batch.parallel = n;
        }
        if let Some(provider) = self.provider {
            config.llm.provider = provider.to_string();
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        config.validate()?;
        Ok(())
    }
}

/// Execute the run command.
pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<ExitCode> {
    args.apply(&mut config)?;

    let input_path = config.input_file();
    if !input_path.exists() {
        anyhow::bail!(
            "Input file does not exist: {:?}\n\n  Hint: pass --input or set INPUT_FILE.",
            input_path
        );
    }
    let recipes = input::load_recipes(&input_path)?;
    if recipes.is_empty() {
        tracing::warn!("No recipes found in {:?}", input_path);
    }

    let provider = LlmProviderFactory::create(&config.llm)?;
    if !provider.is_available().await {
        tracing::warn!(
            "Provider {} does not look available; requests will likely fail",
            provider.name()
        );
    }
    let model = provider.model().to_string();

    let mut enricher = Enricher::new(provider, EnrichOptions::from_config(&config)?);
    if config.cache.enabled {
        match RecipeCache::open(config.cache_dir(), &model) {
            Ok(cache) => enricher = enricher.with_cache(cache),
            Err(e) => tracing::warn!("Cache disabled, cannot open {:?}: {e}", config.cache_dir()),
        }
    }

    let store = CheckpointStore::open(config.output_dir(), config.output.pretty)?;
    let runner = BatchRunner::new(enricher, store, config.run_options(args.partial));

    tokio::spawn(handle_interrupts(
        tokio::signal::ctrl_c,
        runner.stop_handle(),
        || std::process::exit(130),
    ));

    let progress = create_progress_bar(recipes.len() as u64);
    let mut failed = 0usize;
    let report = runner
        .run_with_progress(&recipes, |event| match event {
            Progress::BatchSkipped { recipes, .. } => progress.inc(recipes as u64),
            Progress::RecipeDone { ok, .. } => {
                if !ok {
                    failed += 1;
                    progress.set_message(format!("{failed} failed"));
                }
                progress.inc(1);
            }
            Progress::BatchDone { batch } => {
                tracing::debug!("Checkpointed batch {batch}");
            }
        })
        .await;
    progress.finish_and_clear();

    let report = report?;
    print_run_summary(&report);

    Ok(if report.has_unresolved_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// The first interrupt asks the runner to stop after the current batch; a
/// second one calls `force_quit`.
async fn handle_interrupts<S, Fut, Q>(mut signal: S, stop: Arc<AtomicBool>, force_quit: Q)
where
    S: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
    Q: FnOnce(),
{
    if signal().await.is_err() {
        return;
    }
    tracing::warn!("Interrupt received; stopping after the current batch (Ctrl-C again to quit now)");
    stop.store(true, Ordering::SeqCst);

    if signal().await.is_ok() {
        tracing::warn!("Second interrupt; exiting without finishing the current batch");
        force_quit();
    }
}

/// Create a progress bar over all recipes.
fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}
