//! The `saffron aggregate` command: combine checkpoints without enriching.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use saffron_core::batch::{combine, write_final, CheckpointStore};
use saffron_core::Config;

use super::summary::print_aggregate_summary;

/// Arguments for the `aggregate` command.
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Directory holding the batch checkpoints
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Combine whatever checkpoints exist, even with gaps
    #[arg(long)]
    pub partial: bool,
}

/// Execute the aggregate command.
pub fn execute(args: AggregateArgs, mut config: Config) -> anyhow::Result<ExitCode> {
    if let Some(dir) = args.output_dir {
        config.general.output_dir = dir;
    }

    let dir = config.output_dir();
    if !dir.is_dir() {
        anyhow::bail!("Output directory does not exist: {:?}", dir);
    }
    let store = CheckpointStore::open(&dir, config.output.pretty)?;
    if store.indices()?.is_empty() {
        anyhow::bail!(
            "No checkpoints found in {:?}\n\n  Hint: run `saffron run` first.",
            dir
        );
    }

    let output = combine(&store, None, args.partial)?;
    let path = config.final_output_path();
    write_final(&path, &output, config.output.pretty)?;
    print_aggregate_summary(&output, &path);

    Ok(if output.is_complete() && output.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use saffron_core::SaffronError;

    fn setup(batches: &[usize]) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        for &batch in batches {
            std::fs::write(
                dir.path().join(CheckpointStore::file_name(batch)),
                format!(r#"{{"batch": {batch}, "records": [], "failures": []}}"#),
            )
            .unwrap();
        }
        let mut config = Config::default();
        config.general.output_dir = dir.path().to_path_buf();
        (dir, config)
    }

    fn args(partial: bool) -> AggregateArgs {
        AggregateArgs {
            output_dir: None,
            partial,
        }
    }

    #[test]
    fn test_aggregate_complete_run() {
        let (_dir, config) = setup(&[0, 1]);
        let path = config.final_output_path();
        assert_eq!(execute(args(false), config).unwrap(), ExitCode::SUCCESS);
        assert_eq!(std::fs::read_to_string(path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_aggregate_gap_fails_without_partial() {
        let (_dir, config) = setup(&[0, 2]);
        let err = execute(args(false), config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SaffronError>(),
            Some(SaffronError::IncompleteRun { .. })
        ));
    }

    #[test]
    fn test_aggregate_gap_with_partial_exits_nonzero() {
        let (_dir, config) = setup(&[0, 2]);
        let path = config.final_output_path();
        assert_eq!(execute(args(true), config).unwrap(), ExitCode::FAILURE);
        assert!(path.exists());
    }

    #[test]
    fn test_aggregate_without_checkpoints() {
        let (_dir, config) = setup(&[]);
        assert!(execute(args(false), config).is_err());
    }
}
