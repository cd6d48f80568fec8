//! Logging initialization.
//!
//! Logs go to stderr so they never interleave with command output on stdout.
//! `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber with an explicit level.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section. `-v` forces
/// debug, `--json-logs` forces JSON.
pub fn init_from_config(config: &saffron_core::Config, verbose: bool, json_logs: bool) {
    init(
        &effective_level(&config.logging.level, verbose),
        json_logs || config.logging.format == "json",
    );
}

fn effective_level(configured: &str, verbose: bool) -> String {
    if verbose && !matches!(configured, "debug" | "trace") {
        "debug".to_string()
    } else {
        configured.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level("info", false), "info");
        assert_eq!(effective_level("warn", true), "debug");
        assert_eq!(effective_level("trace", true), "trace");
    }
}
