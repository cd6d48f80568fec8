//! Retry policy for model calls.
//!
//! Classifies failures as retryable or not, computes exponential backoff
//! with optional jitter, and drives the bounded attempt loop.

use crate::config::RetryConfig;
use crate::error::EnrichError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Determine whether an enrichment error is worth retrying.
///
/// Transient errors and schema mismatches are retried (a re-prompt may
/// produce conformant output). Permanent errors are not.
pub fn is_retryable(error: &EnrichError) -> bool {
    matches!(
        error,
        EnrichError::Transient { .. } | EnrichError::Validation(_)
    )
}

/// Whether an HTTP status signals a transient condition.
///
/// 408 (request timeout), 429 (rate limit), and all 5xx are transient.
pub fn is_transient_status(code: u16) -> bool {
    code == 408 || code == 429 || (500..=599).contains(&code)
}

/// Build the error for a non-success HTTP response.
pub fn http_error(provider: &str, status: reqwest::StatusCode, body: &str) -> EnrichError {
    let code = status.as_u16();
    let message = format!("{provider} HTTP {status}: {}", truncate(body, 500));
    if is_transient_status(code) {
        EnrichError::Transient {
            message,
            status_code: Some(code),
        }
    } else {
        EnrichError::Permanent {
            message,
            status_code: Some(code),
        }
    }
}

/// Build the error for a request that never produced a response.
///
/// A request that could not even be built is permanent; anything on the
/// wire (connect, timeout, truncated body) is transient.
pub fn request_error(provider: &str, error: &reqwest::Error) -> EnrichError {
    let message = format!("{provider} request failed: {error}");
    if error.is_builder() {
        EnrichError::permanent(message)
    } else {
        EnrichError::transient(message)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Calculate exponential backoff duration for a given retry.
///
/// Uses `base_delay * 2^retry`, capped at `max_delay_ms`.
pub fn backoff_duration(retry: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(retry));
    Duration::from_millis(delay.min(max_delay_ms))
}

/// Pick a delay uniformly from `[delay / 2, delay]`.
pub fn with_jitter<R: Rng>(delay: Duration, rng: &mut R) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return delay;
    }
    Duration::from_millis(rng.gen_range(ms / 2..=ms))
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 are treated as 1
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
        }
    }

    /// Delay to wait before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = backoff_duration(retry, self.base_delay_ms, self.max_delay_ms);
        if self.jitter {
            with_jitter(delay, &mut rand::thread_rng())
        } else {
            delay
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Returns the outcome together with the number of calls made. Exhausting
    /// the attempts yields [`EnrichError::RetryExhausted`] wrapping the last
    /// error; a non-retryable error is returned as-is.
    pub async fn call_counted<T, F, Fut>(&self, mut op: F) -> (Result<T, EnrichError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EnrichError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match op().await {
                Ok(value) => return (Ok(value), attempt),
                Err(e) => e,
            };

            if !is_retryable(&error) {
                return (Err(error), attempt);
            }
            if attempt >= max_attempts {
                let exhausted = EnrichError::RetryExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                };
                return (Err(exhausted), attempt);
            }

            let delay = self.delay_for(attempt - 1);
            tracing::debug!("Attempt {attempt}/{max_attempts} failed ({error}); retrying in {delay:?}");
            tokio::time::sleep(delay).await;
        }
    }

    /// Like [`call_counted`](Self::call_counted), without the attempt count.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, EnrichError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EnrichError>>,
    {
        self.call_counted(op).await.0
    }
}
