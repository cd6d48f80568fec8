//! Per-recipe enrichment: cache lookup, model call, validation, retry.
//!
//! The enricher owns the provider and prompt. For each recipe it runs the
//! adapter call and the schema check inside the retry policy, so a
//! malformed response is re-requested just like a rate-limited one.

use super::prompt::PromptTemplate;
use super::provider::{LlmProvider, LlmRequest};
use super::retry::RetryPolicy;
use crate::cache::RecipeCache;
use crate::config::Config;
use crate::error::{ConfigError, EnrichError, ValidationError};
use crate::schema;
use crate::types::{EnrichedRecipe, EnrichmentResult, Recipe};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the enrichment engine.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Prompt templates
    pub template: PromptTemplate,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Retry policy applied to each recipe
    pub retry: RetryPolicy,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            template: PromptTemplate::default(),
            timeout_ms: 60_000,
            max_tokens: 1500,
            temperature: 0.2,
            retry: RetryPolicy::default(),
        }
    }
}

impl EnrichOptions {
    /// Build options from config, loading the prompt file if one is set.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let template = match &config.llm.prompt_file {
            Some(path) => {
                let path = shellexpand::tilde(&path.to_string_lossy()).into_owned();
                PromptTemplate::load(std::path::Path::new(&path))?
            }
            None => PromptTemplate::default(),
        };
        Ok(Self {
            template,
            timeout_ms: config.llm.timeout_ms,
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            retry: RetryPolicy::from_config(&config.retry),
        })
    }
}

/// Result of enriching a single recipe.
#[derive(Debug)]
pub enum EnrichResult {
    Success {
        enriched: EnrichedRecipe,
        /// Model calls made (0 for a cache hit)
        attempts: u32,
        cached: bool,
    },
    Failure {
        recipe: Recipe,
        error: EnrichError,
        attempts: u32,
    },
}

impl EnrichResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// LLM enrichment engine.
pub struct Enricher {
    provider: Arc<dyn LlmProvider>,
    options: EnrichOptions,
    cache: Option<RecipeCache>,
}

impl Enricher {
    pub fn new(provider: Box<dyn LlmProvider>, options: EnrichOptions) -> Self {
        Self {
            provider: Arc::from(provider),
            options,
            cache: None,
        }
    }

    /// Attach a result cache consulted before every model call.
    pub fn with_cache(mut self, cache: RecipeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Send one request for `recipe` and return the model's raw text.
    ///
    /// Makes exactly one outbound call. A call exceeding the timeout is a
    /// transient error.
    pub async fn request_raw(&self, recipe: &Recipe) -> Result<String, EnrichError> {
        let request = LlmRequest::enrich_recipe(
            recipe,
            &self.options.template,
            self.options.max_tokens,
            self.options.temperature,
        );

        match tokio::time::timeout(
            Duration::from_millis(self.options.timeout_ms),
            self.provider.generate(&request),
        )
        .await
        {
            Ok(Ok(response)) => {
                tracing::debug!(
                    recipe = %recipe.id,
                    model = %response.model,
                    latency_ms = response.latency_ms,
                    tokens = ?response.tokens_used,
                    "Model responded"
                );
                Ok(response.text)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EnrichError::transient(format!(
                "Timeout after {}ms",
                self.options.timeout_ms
            ))),
        }
    }

    /// Enrich a single recipe with caching and retry.
    pub async fn enrich(&self, recipe: &Recipe) -> EnrichResult {
        if let Some(cache) = &self.cache {
            if let Some(result) = cache.get(recipe).await {
                return join(recipe, result, 0, true);
            }
        }

        let (outcome, attempts) = self
            .options
            .retry
            .call_counted(|| async move {
                let raw = self.request_raw(recipe).await?;
                parse_and_validate(&raw, &recipe.id)
            })
            .await;

        match outcome {
            Ok(result) => {
                if let Some(cache) = &self.cache {
                    cache.set(recipe, &result).await;
                }
                join(recipe, result, attempts, false)
            }
            Err(error) => {
                tracing::warn!(
                    "Failed to enrich recipe {} ({}) after {attempts} attempt(s): {error}",
                    recipe.id,
                    recipe.title
                );
                EnrichResult::Failure {
                    recipe: recipe.clone(),
                    error,
                    attempts,
                }
            }
        }
    }
}

fn join(recipe: &Recipe, result: EnrichmentResult, attempts: u32, cached: bool) -> EnrichResult {
    match EnrichedRecipe::new(recipe.clone(), result) {
        Some(enriched) => EnrichResult::Success {
            enriched,
            attempts,
            cached,
        },
        None => EnrichResult::Failure {
            recipe: recipe.clone(),
            error: ValidationError::new("id", "does not match the recipe").into(),
            attempts,
        },
    }
}

/// Parse raw model text and validate it against the schema.
///
/// The recipe id is assigned locally: it is filled in when the model omits
/// it, and a different id is rejected.
pub fn parse_and_validate(raw: &str, recipe_id: &str) -> Result<EnrichmentResult, EnrichError> {
    let mut value = schema::parse_response(raw)?;

    if let Value::Object(obj) = &mut value {
        let missing = match obj.get("id") {
            None | Some(Value::Null) => true,
            Some(Value::String(id)) if id.trim().is_empty() => true,
            Some(Value::String(id)) if id.trim() != recipe_id => {
                return Err(ValidationError::new(
                    "id",
                    format!("expected '{recipe_id}', got '{id}'"),
                )
                .into());
            }
            _ => false,
        };
        if missing {
            obj.insert("id".to_string(), Value::String(recipe_id.to_string()));
        }
    }

    Ok(schema::validate(&value)?)
}
