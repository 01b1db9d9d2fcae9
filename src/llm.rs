use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::config::{ApiStyle, ModelConfig};
use crate::error::PipelineError;
use crate::TARGET_LLM_REQUEST;

/// Seam between the pipeline stages and the remote model endpoint, so tests
/// can drive the stages with scripted generators.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the generated text, or an empty string when the endpoint
    /// exhausted its retries on non-timeout failures (the caller is expected
    /// to fall back). Only a pure-timeout exhaustion is an error.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, PipelineError>;
}

/// One failed attempt against the model endpoint.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Timeout,
    Status(StatusCode, String),
    Network(reqwest::Error),
    EmptyResponse,
}

impl AttemptError {
    fn is_timeout(&self) -> bool {
        match self {
            AttemptError::Timeout => true,
            AttemptError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Timeout => write!(f, "request timed out"),
            AttemptError::Status(status, body) => {
                write!(f, "status {}: {:.200}", status, body)
            }
            AttemptError::Network(e) => write!(f, "connection error: {}", e),
            AttemptError::EmptyResponse => write!(f, "empty response from model"),
        }
    }
}

/// Runs `attempt_fn` up to `max_retries` times with exponential backoff
/// (`2^attempt` seconds) between attempts.
///
/// Exhaustion where every failure was a timeout becomes
/// `PipelineError::ModelTimeout`; any other exhaustion is the soft failure,
/// an empty string. Cancellation is not handled here: dropping the returned
/// future aborts the in-flight attempt and nothing is retried.
pub(crate) async fn retry_with_backoff<'a, F>(
    max_retries: usize,
    mut attempt_fn: F,
    label: &str,
) -> Result<String, PipelineError>
where
    F: FnMut(usize) -> BoxFuture<'a, Result<String, AttemptError>>,
{
    let mut all_timeouts = true;

    for attempt in 0..max_retries {
        match attempt_fn(attempt).await {
            Ok(text) => {
                debug!(target: TARGET_LLM_REQUEST, "[{}]: response received ({} chars)", label, text.len());
                return Ok(text);
            }
            Err(err) => {
                if !err.is_timeout() {
                    all_timeouts = false;
                }
                warn!(target: TARGET_LLM_REQUEST, "[{}]: attempt {}/{} failed: {}", label, attempt + 1, max_retries, err);
            }
        }

        if attempt + 1 < max_retries {
            let backoff = Duration::from_secs(1u64 << attempt);
            debug!(target: TARGET_LLM_REQUEST, "[{}]: backing off {:?} before retry", label, backoff);
            sleep(backoff).await;
        }
    }

    if all_timeouts {
        error!(target: TARGET_LLM_REQUEST, "[{}]: all {} attempts timed out", label, max_retries);
        Err(PipelineError::ModelTimeout)
    } else {
        error!(target: TARGET_LLM_REQUEST, "[{}]: no response after {} attempts", label, max_retries);
        Ok(String::new())
    }
}

/// HTTP client for one OpenAI-compatible text-generation endpoint, with
/// retry, backoff, and timeout policy owned here. No caching at this layer.
pub struct ModelClient {
    http: reqwest::Client,
    config: ModelConfig,
}

impl ModelClient {
    pub fn new(config: ModelConfig) -> Self {
        ModelClient {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn request_parts(&self, prompt: &str, system_prompt: Option<&str>) -> (String, Value) {
        match self.config.style {
            ApiStyle::Chat => {
                let mut messages = Vec::new();
                if let Some(system) = system_prompt {
                    messages.push(json!({"role": "system", "content": system}));
                }
                messages.push(json!({"role": "user", "content": prompt}));
                (
                    format!("{}/v1/chat/completions", self.config.endpoint),
                    json!({
                        "messages": messages,
                        "max_tokens": self.config.max_tokens,
                        "temperature": self.config.temperature,
                    }),
                )
            }
            ApiStyle::Completion => {
                let full_prompt = match system_prompt {
                    Some(system) => format!("{}\n\n{}", system, prompt),
                    None => prompt.to_string(),
                };
                (
                    format!("{}/v1/completions", self.config.endpoint),
                    json!({
                        "model": self.config.model,
                        "prompt": full_prompt,
                        "max_tokens": self.config.max_tokens,
                        "temperature": self.config.temperature,
                    }),
                )
            }
        }
    }

    /// One HTTP round trip, bounded by the per-call model timeout.
    async fn attempt(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, AttemptError> {
        let (url, payload) = self.request_parts(prompt, system_prompt);

        let call = async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.config.token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        AttemptError::Timeout
                    } else {
                        AttemptError::Network(e)
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AttemptError::Status(status, body));
            }

            let body: Value = response.json().await.map_err(AttemptError::Network)?;
            let text = match self.config.style {
                ApiStyle::Chat => body["choices"][0]["message"]["content"].as_str(),
                ApiStyle::Completion => body["choices"][0]["text"].as_str(),
            }
            .unwrap_or_default()
            .to_string();

            if text.is_empty() {
                Err(AttemptError::EmptyResponse)
            } else {
                Ok(text)
            }
        };

        match timeout(self.config.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout),
        }
    }
}

#[async_trait]
impl TextGenerator for ModelClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, PipelineError> {
        debug!(target: TARGET_LLM_REQUEST, "[{}]: sending prompt ({} chars)", self.config.model, prompt.len());
        retry_with_backoff(
            self.config.max_retries,
            |_| self.attempt(prompt, system_prompt).boxed(),
            &self.config.model,
        )
        .await
    }
}
