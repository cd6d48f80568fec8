//! Sequential batch runner with checkpointing and resume.
//!
//! Batches run strictly one after another. Within a batch, up to `parallel`
//! recipes are in flight at once; results keep input order. Each batch's
//! checkpoint is durable before the next batch starts, so a crash loses at
//! most the batch in progress.

use super::aggregate::{combine, write_final, FinalOutput};
use super::checkpoint::{BatchCheckpoint, CheckpointStore};
use crate::error::{EnrichError, Result};
use crate::llm::{EnrichResult, Enricher};
use crate::output::{append_failures, rewrite_failures};
use crate::types::{FailureRecord, Recipe};
use futures_util::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Recipes per batch (at least 1)
    pub batch_size: usize,
    /// Recipes in flight within a batch (at least 1)
    pub parallel: usize,
    /// JSONL log of unresolved failures
    pub failure_log: PathBuf,
    /// Combined output, written once every batch is checkpointed
    pub final_output: PathBuf,
    pub pretty: bool,
    /// Write the final file from whatever is checkpointed even when the run
    /// was cancelled
    pub partial: bool,
}

/// Progress notifications for a UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// A batch was skipped because its checkpoint already exists
    BatchSkipped { batch: usize, recipes: usize },
    /// One recipe finished (successfully or not)
    RecipeDone { batch: usize, ok: bool },
    /// A batch's checkpoint was written
    BatchDone { batch: usize },
}

/// Outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub total_recipes: usize,
    pub total_batches: usize,
    /// Batches enriched in this invocation
    pub batches_run: usize,
    /// Batches skipped because they were already checkpointed
    pub batches_skipped: usize,
    /// Recipes whose batch was skipped
    pub recipes_skipped: usize,
    /// Enriched records across all checkpoints
    pub succeeded: usize,
    /// Unresolved failures across all checkpoints
    pub failed: usize,
    /// Results served from the cache in this invocation
    pub cache_hits: usize,
    pub cancelled: bool,
    /// Set when the final file was written
    pub final_output: Option<PathBuf>,
    pub failure_log: PathBuf,
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether the run left anything undone: a failed recipe, a cancelled
    /// run, or batches without a checkpoint.
    pub fn has_unresolved_failures(&self) -> bool {
        self.failed > 0 || self.cancelled || self.final_output.is_none()
    }
}

/// Drives the enricher over all batches.
pub struct BatchRunner {
    enricher: Enricher,
    store: CheckpointStore,
    options: RunOptions,
    stop: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(enricher: Enricher, store: CheckpointStore, options: RunOptions) -> Self {
        Self {
            enricher,
            store,
            options,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run before the next batch when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Number of batches `total` recipes split into.
    pub fn batch_count(total: usize, batch_size: usize) -> usize {
        total.div_ceil(batch_size.max(1))
    }

    pub async fn run(&self, recipes: &[Recipe]) -> Result<RunReport> {
        self.run_with_progress(recipes, |_| {}).await
    }

    /// Enrich every recipe not already checkpointed, then combine all
    /// checkpoints into the final output.
    ///
    /// Per-recipe failures are recorded and do not stop the run. A checkpoint
    /// or output write failure is returned as an error, as is an existing
    /// checkpoint that was produced from a different partition of the input.
    pub async fn run_with_progress<F>(&self, recipes: &[Recipe], mut on_progress: F) -> Result<RunReport>
    where
        F: FnMut(Progress),
    {
        let start = Instant::now();
        let batch_size = self.options.batch_size.max(1);
        let total_batches = Self::batch_count(recipes.len(), batch_size);

        let mut report = RunReport {
            total_recipes: recipes.len(),
            total_batches,
            failure_log: self.options.failure_log.clone(),
            ..RunReport::default()
        };

        tracing::info!(
            "Enriching {} recipes in {} batch(es) of up to {} with {}/{}",
            recipes.len(),
            total_batches,
            batch_size,
            self.enricher.provider_name(),
            self.enricher.model()
        );

        for (batch, chunk) in recipes.chunks(batch_size).enumerate() {
            if self.store.exists(batch) {
                self.store.read_for_chunk(batch, batch_size, chunk)?;
                tracing::info!("Batch {batch} already checkpointed, skipping");
                report.batches_skipped += 1;
                report.recipes_skipped += chunk.len();
                on_progress(Progress::BatchSkipped {
                    batch,
                    recipes: chunk.len(),
                });
                continue;
            }

            if self.stop.load(Ordering::SeqCst) {
                tracing::warn!("Stop requested; halting before batch {batch}");
                report.cancelled = true;
                break;
            }

            let checkpoint = self
                .run_batch(batch, batch_size, chunk, &mut report, &mut on_progress)
                .await;
            self.store.write(&checkpoint)?;
            if let Err(e) = append_failures(&self.options.failure_log, &checkpoint.failures) {
                tracing::error!(
                    "Failed to append to failure log {:?}: {e}",
                    self.options.failure_log
                );
            }

            tracing::info!(
                "Batch {}/{} done: {} enriched, {} failed",
                batch + 1,
                total_batches,
                checkpoint.records.len(),
                checkpoint.failures.len()
            );
            report.batches_run += 1;
            on_progress(Progress::BatchDone { batch });
        }

        let output = if !report.cancelled || self.options.partial {
            let output = combine(&self.store, Some(total_batches), self.options.partial)?;
            write_final(&self.options.final_output, &output, self.options.pretty)?;
            report.final_output = Some(self.options.final_output.clone());
            output
        } else {
            combine(&self.store, Some(total_batches), true)?
        };
        self.tally(&mut report, &output);

        // Checkpoints are authoritative; drop log lines from batches that
        // were since removed and rerun.
        if let Err(e) = rewrite_failures(&self.options.failure_log, &output.failures) {
            tracing::error!(
                "Failed to rewrite failure log {:?}: {e}",
                self.options.failure_log
            );
        }

        report.elapsed = start.elapsed();
        Ok(report)
    }

    async fn run_batch<F>(
        &self,
        batch: usize,
        batch_size: usize,
        chunk: &[Recipe],
        report: &mut RunReport,
        on_progress: &mut F,
    ) -> BatchCheckpoint
    where
        F: FnMut(Progress),
    {
        let mut checkpoint = BatchCheckpoint::for_chunk(batch, batch_size, chunk);

        let mut results = stream::iter(chunk)
            .map(|recipe| self.enricher.enrich(recipe))
            .buffered(self.options.parallel.max(1));

        while let Some(result) = results.next().await {
            let ok = result.is_success();
            match result {
                EnrichResult::Success {
                    enriched, cached, ..
                } => {
                    if cached {
                        report.cache_hits += 1;
                    }
                    checkpoint.records.push(enriched);
                }
                EnrichResult::Failure {
                    recipe,
                    error,
                    attempts,
                } => {
                    checkpoint
                        .failures
                        .push(failure_record(batch, &recipe, &error, attempts));
                }
            }
            on_progress(Progress::RecipeDone { batch, ok });
        }
        checkpoint
    }

    fn tally(&self, report: &mut RunReport, output: &FinalOutput) {
        report.succeeded = output.records.len();
        report.failed = output.failures.len();
    }
}

fn failure_record(batch: usize, recipe: &Recipe, error: &EnrichError, attempts: u32) -> FailureRecord {
    FailureRecord {
        batch,
        id: recipe.id.clone(),
        title: recipe.title.clone(),
        kind: error.kind().to_string(),
        attempts,
        error: error.to_string(),
    }
}
