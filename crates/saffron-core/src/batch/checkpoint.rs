//! Per-batch checkpoint files.
//!
//! A checkpoint is written once, atomically, when its batch finishes and is
//! never modified afterwards. Its presence marks a batch as done, provided
//! it was produced from the same partition of the same input.

use crate::error::{Result, SaffronError};
use crate::output::write_json_atomic;
use crate::types::{EnrichedRecipe, FailureRecord, Recipe};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "enriched_recipes_batch_";
const FILE_SUFFIX: &str = ".json";

/// The persisted result of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCheckpoint {
    /// Zero-based batch index
    pub batch: usize,
    /// Batch size of the run that wrote this checkpoint (0 if unknown)
    #[serde(default)]
    pub batch_size: usize,
    /// Ids of every recipe in the batch, in input order
    #[serde(default)]
    pub recipe_ids: Vec<String>,
    pub records: Vec<EnrichedRecipe>,
    #[serde(default)]
    pub failures: Vec<FailureRecord>,
}

impl BatchCheckpoint {
    /// An empty checkpoint for `chunk`, the `batch`-th slice of size `batch_size`.
    pub fn for_chunk(batch: usize, batch_size: usize, chunk: &[Recipe]) -> Self {
        Self {
            batch,
            batch_size,
            recipe_ids: chunk.iter().map(|r| r.id.clone()).collect(),
            records: Vec::with_capacity(chunk.len()),
            failures: Vec::new(),
        }
    }

    /// Check that this checkpoint covers exactly `chunk` under `batch_size`.
    ///
    /// Returns a description of the first difference.
    pub fn matches(&self, batch_size: usize, chunk: &[Recipe]) -> std::result::Result<(), String> {
        if self.batch_size != batch_size {
            return Err(format!(
                "written with batch size {}, current batch size is {batch_size}",
                self.batch_size
            ));
        }
        let ids = chunk.iter().map(|r| r.id.as_str());
        if !self.recipe_ids.iter().map(String::as_str).eq(ids) {
            return Err(format!(
                "covers recipes [{}], input now has [{}] in this batch",
                self.recipe_ids.join(", "),
                chunk.iter().map(|r| r.id.as_str()).collect::<Vec<_>>().join(", ")
            ));
        }
        Ok(())
    }
}

/// Checkpoint files in one output directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    pretty: bool,
}

impl CheckpointStore {
    /// Open a store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>, pretty: bool) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| SaffronError::Checkpoint {
            path: dir.clone(),
            message: format!("cannot create output directory: {e}"),
        })?;
        Ok(Self { dir, pretty })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `enriched_recipes_batch_00003.json` for batch 3.
    pub fn file_name(batch: usize) -> String {
        format!("{FILE_PREFIX}{batch:05}{FILE_SUFFIX}")
    }

    pub fn path(&self, batch: usize) -> PathBuf {
        self.dir.join(Self::file_name(batch))
    }

    pub fn exists(&self, batch: usize) -> bool {
        self.path(batch).is_file()
    }

    /// Persist a checkpoint. Fatal to the run on failure.
    pub fn write(&self, checkpoint: &BatchCheckpoint) -> Result<()> {
        let path = self.path(checkpoint.batch);
        write_json_atomic(&path, checkpoint, self.pretty).map_err(|e| {
            SaffronError::Checkpoint {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        tracing::debug!(
            "Checkpoint written: {:?} ({} records, {} failures)",
            path,
            checkpoint.records.len(),
            checkpoint.failures.len()
        );
        Ok(())
    }

    pub fn read(&self, batch: usize) -> Result<BatchCheckpoint> {
        self.read_with(batch, |_| Ok(()))
    }

    /// Read a checkpoint for resume, failing unless it was produced from
    /// `chunk` with the same `batch_size`.
    pub fn read_for_chunk(
        &self,
        batch: usize,
        batch_size: usize,
        chunk: &[Recipe],
    ) -> Result<BatchCheckpoint> {
        self.read_with(batch, |checkpoint| {
            checkpoint.matches(batch_size, chunk).map_err(|reason| {
                format!("stale checkpoint ({reason}); remove the output directory or restore the previous input and batch size")
            })
        })
    }

    fn read_with<F>(&self, batch: usize, check: F) -> Result<BatchCheckpoint>
    where
        F: FnOnce(&BatchCheckpoint) -> std::result::Result<(), String>,
    {
        let path = self.path(batch);
        let checkpoint_err = |message: String| SaffronError::Checkpoint {
            path: path.clone(),
            message,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| checkpoint_err(e.to_string()))?;
        let checkpoint: BatchCheckpoint = serde_json::from_str(&content)
            .map_err(|e| checkpoint_err(format!("corrupt checkpoint: {e}")))?;
        if checkpoint.batch != batch {
            return Err(checkpoint_err(format!(
                "file claims batch {}",
                checkpoint.batch
            )));
        }
        check(&checkpoint).map_err(checkpoint_err)?;
        Ok(checkpoint)
    }

    /// Indices of every checkpoint present, ascending. Temp files and
    /// unrelated files are ignored.
    pub fn indices(&self) -> Result<Vec<usize>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| SaffronError::Checkpoint {
            path: self.dir.clone(),
            message: e.to_string(),
        })?;

        let mut indices: Vec<usize> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| parse_index(&entry.file_name().to_string_lossy()))
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }
}

fn parse_index(file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
