//! Combine batch checkpoints into the final output.

use super::checkpoint::CheckpointStore;
use crate::error::{Result, SaffronError};
use crate::output::write_json_atomic;
use crate::types::{EnrichedRecipe, FailureRecord};
use std::path::Path;

/// Every checkpointed record, in batch-then-record order.
#[derive(Debug, Clone, Default)]
pub struct FinalOutput {
    pub records: Vec<EnrichedRecipe>,
    pub failures: Vec<FailureRecord>,
    /// Batch indices that were combined
    pub batches: Vec<usize>,
    /// Batch indices absent from the run (non-empty only for a partial combine)
    pub missing: Vec<usize>,
}

impl FinalOutput {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Batches absent from `0..expected`, or from `0..=max(present)` when the
/// expected count is unknown.
pub fn missing_batches(present: &[usize], expected: Option<usize>) -> Vec<usize> {
    let end = match expected {
        Some(n) => n,
        None => present.iter().max().map_or(0, |max| max + 1),
    };
    (0..end).filter(|i| present.binary_search(i).is_err()).collect()
}

/// Read every checkpoint in `store` and concatenate them in batch order.
///
/// Fails with [`SaffronError::IncompleteRun`] if a batch is missing, unless
/// `partial` is set.
pub fn combine(
    store: &CheckpointStore,
    expected_batches: Option<usize>,
    partial: bool,
) -> Result<FinalOutput> {
    let mut batches = store.indices()?;
    if let Some(n) = expected_batches {
        batches.retain(|&i| i < n);
    }

    let missing = missing_batches(&batches, expected_batches);
    if !missing.is_empty() {
        if !partial {
            return Err(SaffronError::IncompleteRun { missing });
        }
        tracing::warn!(
            "Combining partial run; {} batch(es) missing",
            missing.len()
        );
    }

    let mut output = FinalOutput {
        missing,
        ..FinalOutput::default()
    };
    for &batch in &batches {
        let checkpoint = store.read(batch)?;
        output.records.extend(checkpoint.records);
        output.failures.extend(checkpoint.failures);
    }
    output.batches = batches;

    tracing::info!(
        "Combined {} checkpoint(s): {} records, {} failures",
        output.batches.len(),
        output.records.len(),
        output.failures.len()
    );
    Ok(output)
}

/// Write the combined records to `path` as a JSON array.
pub fn write_final(path: &Path, output: &FinalOutput, pretty: bool) -> Result<()> {
    write_json_atomic(path, &output.records, pretty).map_err(|e| SaffronError::Checkpoint {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::info!("Final output written to {:?}", path);
    Ok(())
}
