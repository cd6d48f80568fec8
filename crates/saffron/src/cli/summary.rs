//! End-of-run summary tables, printed to stderr.

use saffron_core::batch::{FinalOutput, RunReport};
use std::path::Path;

/// Print a formatted summary table after a run.
pub fn print_run_summary(report: &RunReport) {
    let secs = report.elapsed.as_secs_f64();
    let enriched_now = report.total_recipes.saturating_sub(report.recipes_skipped);
    let rate = if secs > 0.0 {
        enriched_now as f64 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", report.succeeded);
    eprintln!("    Failed:       {:>8}", report.failed);
    if report.recipes_skipped > 0 {
        eprintln!(
            "    Resumed:      {:>8} ({} batch(es) already done)",
            report.recipes_skipped, report.batches_skipped
        );
    }
    if report.cache_hits > 0 {
        eprintln!("    Cache hits:   {:>8}", report.cache_hits);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Recipes:      {:>8}", report.total_recipes);
    eprintln!(
        "    Batches:      {:>8} ({} run now)",
        report.total_batches, report.batches_run
    );
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} recipes/sec", rate);
    eprintln!("  ====================================");

    if report.cancelled {
        eprintln!("  Run cancelled; rerun the same command to resume.");
    }
    match &report.final_output {
        Some(path) => eprintln!("  Output:       {}", path.display()),
        None => eprintln!("  Output:       not written (run incomplete)"),
    }
    if report.failed > 0 {
        eprintln!("  Failure log:  {}", report.failure_log.display());
    }
}

/// Print a short summary after an explicit aggregate.
pub fn print_aggregate_summary(output: &FinalOutput, path: &Path) {
    eprintln!();
    eprintln!("  Combined {} checkpoint(s)", output.batches.len());
    eprintln!("    Records:      {:>8}", output.records.len());
    eprintln!("    Failures:     {:>8}", output.failures.len());
    if !output.missing.is_empty() {
        let missing: Vec<String> = output.missing.iter().map(|b| b.to_string()).collect();
        eprintln!("    Missing:      batch {}", missing.join(", "));
    }
    eprintln!("  Output:       {}", path.display());
}
