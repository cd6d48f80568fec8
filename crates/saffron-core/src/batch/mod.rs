//! Batch processing: partition, enrich, checkpoint, resume, aggregate.

mod aggregate;
mod checkpoint;
mod runner;

pub use aggregate::{combine, missing_batches, write_final, FinalOutput};
pub use checkpoint::{BatchCheckpoint, CheckpointStore};
pub use runner::{BatchRunner, Progress, RunOptions, RunReport};
