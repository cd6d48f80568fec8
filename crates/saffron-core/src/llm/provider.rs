//! LLM provider trait and request/response types.
//!
//! Defines the interface that all LLM providers implement, plus the
//! factory that creates the right provider from config.

use super::prompt::PromptTemplate;
use crate::config::LlmConfig;
use crate::error::EnrichError;
use crate::types::Recipe;
use async_trait::async_trait;
use std::time::Duration;

/// A single text-generation request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// System instructions
    pub system: String,
    /// User prompt with the recipe filled in
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl LlmRequest {
    /// Build an enrichment request for one recipe.
    pub fn enrich_recipe(
        recipe: &Recipe,
        template: &PromptTemplate,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            system: template.system.clone(),
            prompt: template.render(recipe),
            max_tokens,
            temperature,
        }
    }
}

/// The response from an LLM call. `text` is returned unparsed.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// A provider makes exactly one outbound call per `generate` and never
/// retries; retrying belongs to [`super::retry::RetryPolicy`].
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Check whether the provider is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Generate text for the given request.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, EnrichError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the appropriate provider from config.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create the provider selected by `config.provider`, using
    /// `config.model` when set and the provider section's model otherwise.
    pub fn create(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, EnrichError> {
        let model = config.resolved_model();
        let timeout = Duration::from_millis(config.timeout_ms);

        match config.provider.as_str() {
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| {
                    EnrichError::permanent("OpenAI API key not set. Set OPENAI_API_KEY env var.")
                })?;
                Ok(Box::new(super::openai::OpenAiProvider::with_endpoint(
                    &api_key,
                    &model,
                    &cfg.endpoint,
                    timeout,
                )))
            }
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| {
                    EnrichError::permanent(
                        "Anthropic API key not set. Set ANTHROPIC_API_KEY env var.",
                    )
                })?;
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, &model, timeout,
                )))
            }
            "ollama" => {
                let cfg = config.ollama.clone().unwrap_or_default();
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    &model,
                    timeout,
                )))
            }
            other => Err(EnrichError::permanent(format!(
                "Unknown LLM provider: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    #[test]
    fn test_enrich_request_carries_parameters() {
        let recipe = Recipe::new("r1", "Poha", vec!["flattened rice".into()], vec![]);
        let request = LlmRequest::enrich_recipe(&recipe, &PromptTemplate::default(), 800, 0.0);
        assert_eq!(request.max_tokens, 800);
        assert_eq!(request.temperature, 0.0);
        assert!(request.prompt.contains("Poha"));
        assert!(!request.system.is_empty());
    }

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let config = LlmConfig {
            provider: "mystery".into(),
            ..LlmConfig::default()
        };
        let err = LlmProviderFactory::create(&config).err().unwrap();
        assert!(matches!(err, EnrichError::Permanent { .. }));
    }

    #[test]
    fn test_factory_missing_key_is_an_error() {
        let config = LlmConfig {
            openai: Some(OpenAiConfig {
                api_key: "${DEFINITELY_NOT_SET_XYZ_456}".into(),
                ..OpenAiConfig::default()
            }),
            ..LlmConfig::default()
        };
        let err = LlmProviderFactory::create(&config).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_factory_applies_model_override() {
        let config = LlmConfig {
            model: Some("gpt-4o-mini".into()),
            openai: Some(OpenAiConfig {
                api_key: "sk-test".into(),
                ..OpenAiConfig::default()
            }),
            ..LlmConfig::default()
        };
        let provider = LlmProviderFactory::create(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
        assert_eq!(provider.timeout(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_factory_ollama_needs_no_key() {
        let config = LlmConfig {
            provider: "ollama".into(),
            ..LlmConfig::default()
        };
        let provider = LlmProviderFactory::create(&config).unwrap();
        assert_eq!(provider.model(), "llama3.1");
    }
}
