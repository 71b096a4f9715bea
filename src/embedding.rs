//! Remote embedding provider over the Azure OpenAI embeddings REST API.
//!
//! [`AzureOpenAIProvider`] implements
//! [`nightspot_core::embedding::EmbeddingProvider`] and is the only piece of
//! the embedding tier that touches the network. [`embedding_backend`] turns
//! the `[embedding]` config section into the core's [`EmbeddingBackend`],
//! unavailable when settings are missing so the engine degrades instead of
//! failing.
//!
//! # Request
//!
//! ```text
//! POST {endpoint}/openai/deployments/{deployment}/embeddings?api-version={api_version}
//! api-key: {credential}
//!
//! { "input": ["text", ...] }
//! ```
//!
//! Inputs are sent in batches of `embedding.batch_size`.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - Timeouts and connection failures → retry
//! - HTTP 401/403 and other 4xx → fail immediately
//! - Backoff: `backoff_base_ms × 2^(attempt-1)`, at most `max_attempts`
//!   attempts in total

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use nightspot_core::embedding::EmbeddingProvider;
use nightspot_core::similarity::EmbeddingBackend;
use nightspot_core::ProviderError;

use crate::config::{Config, EmbeddingConfig};

/// Embedding provider backed by an Azure OpenAI deployment.
pub struct AzureOpenAIProvider {
    client: reqwest::Client,
    url: String,
    credential: String,
    deployment: String,
    batch_size: usize,
    max_attempts: u32,
    timeout_secs: u64,
    backoff_base: Duration,
}

impl AzureOpenAIProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if endpoint, credential, or deployment is missing,
    /// or the HTTP client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if let Some(missing) = config.missing() {
            bail!("{} is required for the embedding tier", missing);
        }
        let endpoint = config.endpoint.clone().unwrap_or_default();
        let credential = config.credential.clone().unwrap_or_default();
        let deployment = config.deployment.clone().unwrap_or_default();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: embeddings_url(&endpoint, &deployment, &config.api_version),
            credential,
            deployment,
            batch_size: config.batch_size.max(1),
            max_attempts: config.max_attempts.max(1),
            timeout_secs: config.timeout_secs,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        })
    }

    /// Embed one batch, retrying transient failures.
    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut last = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = backoff_delay(self.backoff_base, attempt);
                debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "retrying embedding request");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() => {
                    debug!(attempt = attempt + 1, error = %e, "transient embedding failure");
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProviderError::RetriesExhausted {
            attempts: self.max_attempts,
            last: Box::new(
                last.unwrap_or_else(|| ProviderError::Network("no attempt was made".to_string())),
            ),
        })
    }

    async fn attempt(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let body = serde_json::json!({ "input": batch });

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.credential)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), text));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let vectors = parse_embeddings_response(&json)?;
        if vectors.len() != batch.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAIProvider {
    fn model_name(&self) -> &str {
        &self.deployment
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}

/// Delay before retry number `retry` (1-based): `base × 2^(retry-1)`,
/// with the exponent capped at 5. Saturates instead of overflowing.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(1u32 << retry.saturating_sub(1).min(5))
}

/// Build the embeddings URL for a deployment.
pub fn embeddings_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/embeddings?api-version={}",
        endpoint.trim().trim_end_matches('/'),
        deployment.trim(),
        api_version
    )
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: u16, body: String) -> ProviderError {
    let message = body.chars().take(300).collect::<String>();
    match status {
        401 | 403 => ProviderError::Auth { status, message },
        429 => ProviderError::Quota { status, message },
        500..=599 => ProviderError::Server { status, message },
        _ => ProviderError::Client { status, message },
    }
}

fn classify_transport(e: &reqwest::Error, timeout_secs: u64) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout { timeout_secs }
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Parse an embeddings response body.
///
/// Extracts the `data[].embedding` arrays and orders them by `data[].index`
/// so they line up with the request inputs.
pub fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| ProviderError::InvalidResponse("missing data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| ProviderError::InvalidResponse("missing embedding".to_string()))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);

        let vector = embedding
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    ProviderError::InvalidResponse("non-numeric embedding value".to_string())
                })
            })
            .collect::<Result<Vec<f32>, ProviderError>>()?;

        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// The embedding tier for this configuration.
///
/// Disabled or incomplete settings produce an unavailable backend, which
/// makes every index build start one tier lower.
pub fn embedding_backend(config: &Config) -> EmbeddingBackend {
    if config.retrieval.disable_embedding {
        return EmbeddingBackend::unavailable("embedding tier disabled by retrieval.disable_embedding");
    }
    match AzureOpenAIProvider::new(&config.embedding) {
        Ok(provider) => EmbeddingBackend::new(Arc::new(provider)),
        Err(e) => EmbeddingBackend::unavailable(e.to_string()),
    }
}
