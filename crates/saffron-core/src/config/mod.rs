//! Configuration management for Saffron.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file
//! (platform config dir or an explicit path), then the environment overrides
//! `BATCH_SIZE`, `MODEL_NAME`, `MAX_RETRIES`, `INPUT_FILE`, `OUTPUT_DIR`.

mod types;
mod validate;

pub use types::*;

use crate::batch::RunOptions;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Saffron.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input and output locations
    pub general: GeneralConfig,

    /// Batch settings
    pub batch: BatchConfig,

    /// Retry policy
    pub retry: RetryConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Per-recipe result cache
    pub cache: CacheConfig,

    /// Output file settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file layer (explicit path or default location), apply
    /// environment overrides, and validate the result.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored. Numeric values that fail to parse are errors.
    pub fn apply_overrides_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("BATCH_SIZE") {
            self.batch.batch_size = parse_number("BATCH_SIZE", &value)?;
        }
        if let Some(value) = get("MAX_RETRIES") {
            self.retry.max_attempts = parse_number("MAX_RETRIES", &value)?;
        }
        if let Some(value) = get("MODEL_NAME") {
            self.llm.model = Some(value.trim().to_string());
        }
        if let Some(value) = get("INPUT_FILE") {
            self.general.input_file = PathBuf::from(value);
        }
        if let Some(value) = get("OUTPUT_DIR") {
            self.general.output_dir = PathBuf::from(value);
        }
        Ok(())
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.saffron.saffron/config.toml
    /// - Linux: ~/.config/saffron/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\saffron\config\config.toml
    ///
    /// Falls back to ~/.saffron/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "saffron", "saffron")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".saffron").join("config.toml")
            })
    }

    /// Resolved input file path (with ~ expansion).
    pub fn input_file(&self) -> PathBuf {
        expand(&self.general.input_file)
    }

    /// Resolved output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.general.output_dir)
    }

    /// Resolved cache directory: `cache.dir` or `<output_dir>/cache`.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache.dir {
            Some(dir) => expand(dir),
            None => self.output_dir().join("cache"),
        }
    }

    /// Path of the combined output file.
    pub fn final_output_path(&self) -> PathBuf {
        self.output_dir().join(&self.output.final_file)
    }

    /// Path of the JSONL failure log.
    pub fn failure_log_path(&self) -> PathBuf {
        self.output_dir().join(&self.output.failure_log)
    }

    /// Batch runner settings derived from this config.
    pub fn run_options(&self, partial: bool) -> RunOptions {
        RunOptions {
            batch_size: self.batch.batch_size,
            parallel: self.batch.parallel,
            failure_log: self.failure_log_path(),
            final_output: self.final_output_path(),
            pretty: self.output.pretty,
            partial,
        }
    }

    /// A copy safe to display: literal API keys are masked, `${VAR}`
    /// references are kept as-is.
    pub fn redacted(&self) -> Self {
        fn mask(key: &mut String) {
            if !key.is_empty() && !(key.starts_with("${") && key.ends_with('}')) {
                *key = "********".to_string();
            }
        }

        let mut config = self.clone();
        if let Some(openai) = config.llm.openai.as_mut() {
            mask(&mut openai.api_key);
        }
        if let Some(anthropic) = config.llm.anthropic.as_mut() {
            mask(&mut anthropic.api_key);
        }
        config
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&path_str).into_owned())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key} must be a non-negative integer, got '{value}'"))
    })
}
