#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::OllamaConfig;
use crate::embeddings::Embedder;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// HTTP client for the Ollama server, covering both the embedding
/// endpoint used at index/query time and the generation endpoint used
/// for answer synthesis.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    batch_size: u32,
    embedding_dimension: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    model: String,
    #[serde(rename = "input")]
    inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> crate::Result<Self> {
        let base_url = config.ollama_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            batch_size: config.batch_size,
            embedding_dimension: config.embedding_dimension as usize,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Test connection to the Ollama server and verify the configured
    /// models are available
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        self.ping().context("Server ping failed")?;
        self.validate_models().context("Model validation failed")?;

        info!(
            "Health check passed for Ollama server at {} with models {} / {}",
            self.base_url, self.embedding_model, self.generation_model
        );
        Ok(())
    }

    /// Ping the Ollama server to check if it's responsive
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build ping URL")?;

        debug!("Pinging Ollama server at {}", url);

        self.make_request_with_retry(|| {
            self.agent
                .get(url.as_str())
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Failed to ping Ollama server")?;

        debug!("Server ping successful");
        Ok(())
    }

    /// Validate that the configured embedding and generation models are
    /// available on the server
    #[inline]
    pub fn validate_models(&self) -> Result<()> {
        let models = self.list_models().context("Failed to list models")?;

        for wanted in [&self.embedding_model, &self.generation_model] {
            if !models.iter().any(|m| &m.name == wanted) {
                let available_models: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                warn!(
                    "Model {} not found. Available models: {:?}",
                    wanted, available_models
                );
                return Err(anyhow::anyhow!(
                    "Model '{}' is not available. Available models: {:?}",
                    wanted,
                    available_models
                ));
            }
        }

        debug!("Configured models are available");
        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Generate an embedding for a single text input
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: self.embedding_model.clone(),
            prompt: text.to_string(),
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embedding")?;

        let embed_response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        self.validate_vector(&embed_response.embedding)?;

        debug!(
            "Generated embedding with {} dimensions",
            embed_response.embedding.len()
        );

        Ok(embed_response.embedding)
    }

    /// Generate embeddings for multiple text inputs using batch
    /// processing. The result is one vector per input text, in input
    /// order; a count or dimension mismatch from the server fails the
    /// whole call.
    #[inline]
    pub fn generate_embeddings_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        // Process in batches to avoid overwhelming the server
        for chunk in texts.chunks(self.batch_size as usize) {
            let batch_results = self
                .generate_embeddings_single_batch(chunk)
                .with_context(|| format!("Failed to process batch of {} texts", chunk.len()))?;

            results.extend(batch_results);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn generate_embeddings_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.len() == 1 {
            // Use single embedding API for single text
            let embedding = self.generate_embedding(&texts[0])?;
            return Ok(vec![embedding]);
        }

        let request = BatchEmbedRequest {
            model: self.embedding_model.clone(),
            inputs: texts.to_vec(),
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build batch embedding URL")?;

        let request_json = serde_json::to_string(&request)
            .context("Failed to serialize batch embedding request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate batch embeddings")?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .context("Failed to parse batch embedding response")?;

        if batch_response.embeddings.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                batch_response.embeddings.len()
            ));
        }

        for embedding in &batch_response.embeddings {
            self.validate_vector(embedding)?;
        }

        Ok(batch_response.embeddings)
    }

    /// Generate a completion from the configured generation model.
    #[inline]
    pub fn generate_completion(&self, prompt: &str) -> Result<String> {
        debug!("Generating completion (prompt length: {})", prompt.len());

        let request = GenerateRequest {
            model: self.generation_model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: 0.2,
                num_ctx: 4096,
            },
        };

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate completion")?;

        let generate_response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generation response")?;

        Ok(generate_response.response)
    }

    /// Reject vectors with the wrong dimensionality or non-numeric
    /// values before they can reach the index.
    fn validate_vector(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.embedding_dimension {
            return Err(anyhow::anyhow!(
                "Embedding has {} dimensions, expected {}",
                embedding.len(),
                self.embedding_dimension
            ));
        }

        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(anyhow::anyhow!(
                "Embedding contains non-finite values"
            ));
        }

        Ok(())
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true // Retry server errors
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true // Retry transport errors
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false // Don't retry other errors
                        }
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    // Wait before retry (exponential backoff)
                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.generate_embedding(text)
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.generate_embeddings_batch(texts)
    }
}
