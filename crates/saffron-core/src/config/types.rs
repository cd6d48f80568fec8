//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// JSON file containing the recipes to enrich
    pub input_file: PathBuf,

    /// Directory for batch checkpoints, the final file, cache, and failure log
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("recipes.json"),
            output_dir: PathBuf::from("enriched_recipes"),
        }
    }
}

/// Batch partitioning and in-batch concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Recipes per batch (and per checkpoint file)
    pub batch_size: usize,

    /// Concurrent model calls within a batch (1 = sequential)
    pub parallel: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            parallel: 1,
        }
    }
}

/// Retry policy for model calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per recipe, including the first call
    pub max_attempts: u32,

    /// Backoff before the first retry, doubled for each further retry
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay
    pub max_delay_ms: u64,

    /// Randomize each delay to spread out retries
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

/// Per-recipe result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Cache directory; defaults to `<output_dir>/cache`
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

/// Output file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print checkpoint and final JSON
    pub pretty: bool,

    /// File name of the combined output, inside `output_dir`
    pub final_file: String,

    /// File name of the JSONL failure log, inside `output_dir`
    pub failure_log: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            final_file: "enriched_recipes_final.json".to_string(),
            failure_log: "failures.jsonl".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider selection and request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider identifier: "openai", "anthropic", or "ollama"
    pub provider: String,

    /// Model name; overrides the provider section's default when set
    pub model: Option<String>,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Maximum tokens to generate per response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Optional TOML file with `system` and `user` prompt templates
    pub prompt_file: Option<PathBuf>,

    /// OpenAI (or OpenAI-compatible) configuration
    pub openai: Option<OpenAiConfig>,

    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,

    /// Ollama (local) configuration
    pub ollama: Option<OllamaConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            timeout_ms: 60_000,
            max_tokens: 1500,
            temperature: 0.2,
            prompt_file: None,
            openai: None,
            anthropic: None,
            ollama: None,
        }
    }
}

impl LlmConfig {
    /// The model name that will actually be used for the selected provider.
    pub fn resolved_model(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "anthropic" => self.anthropic.clone().unwrap_or_default().model,
            "ollama" => self.ollama.clone().unwrap_or_default().model,
            _ => self.openai.clone().unwrap_or_default().model,
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Chat Completions endpoint (override for OpenAI-compatible services)
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
        }
    }
}
