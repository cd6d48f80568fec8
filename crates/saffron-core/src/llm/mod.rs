//! LLM integration for recipe enrichment.
//!
//! Provides a provider abstraction over several LLM backends (OpenAI,
//! Anthropic, Ollama), a retry policy with exponential backoff, and the
//! enrichment engine that turns one recipe into one validated result.

pub(crate) mod anthropic;
pub(crate) mod enricher;
pub(crate) mod ollama;
pub(crate) mod openai;
pub(crate) mod prompt;
pub(crate) mod provider;
pub(crate) mod retry;

pub use enricher::{parse_and_validate, EnrichOptions, EnrichResult, Enricher};
pub use prompt::PromptTemplate;
pub use provider::{LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
pub use retry::{backoff_duration, is_retryable, with_jitter, RetryPolicy};
