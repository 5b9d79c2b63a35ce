//! Model provider abstraction.
//!
//! The escalation ladder talks to providers through [`GenerationProvider`], a
//! narrow trait: one prompt in, one text reply out. The bundled HTTP
//! implementation speaks the OpenAI-compatible chat completions shape, which
//! covers hosted APIs and local inference servers alike. Swapping in a fake
//! for tests means implementing one async method.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StudioError, StudioResult};

/// Sampling controls for one provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingParams {
    /// Model identifier, passed through to the endpoint verbatim.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// Reply from a single provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderReply {
    /// The completion text.
    pub content: String,
    /// Model that served the call.
    pub model: String,
    /// Wall-clock latency in ms.
    pub response_time_ms: u64,
}

/// A source of model completions.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Stable name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run one completion. The caller enforces the outer time budget.
    async fn generate(&self, prompt: &str, params: &SamplingParams) -> StudioResult<ProviderReply>;

    /// Whether this provider is worth calling at all.
    async fn is_available(&self) -> bool {
        true
    }
}

/// OpenAI-compatible chat completions client.
pub struct HttpProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpProvider {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1` or a
    /// local server's `http://127.0.0.1:8080/v1`.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key,
            // Backstop only; the ladder applies its own per-call budget.
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Read endpoint + key from the environment (`STUDIO_PROVIDER_URL`,
    /// `STUDIO_PROVIDER_KEY`), defaulting to the OpenAI API root.
    pub fn from_env(name: impl Into<String>) -> Self {
        let base_url = std::env::var("STUDIO_PROVIDER_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("STUDIO_PROVIDER_KEY").ok();
        Self::new(name, base_url, api_key)
    }
}

#[async_trait]
impl GenerationProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, params: &SamplingParams) -> StudioResult<ProviderReply> {
        let start = std::time::Instant::now();

        let request_body = serde_json::json!({
            "model": params.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": params.temperature,
            "max_tokens": params.max_tokens
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&request_body);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StudioError::ProviderTimeout {
                    provider: self.name.clone(),
                    timeout_ms: start.elapsed().as_millis() as u64,
                }
            } else {
                StudioError::provider(&self.name, e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StudioError::provider(
                &self.name,
                format!("API error ({status}): {body}"),
            ));
        }

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StudioError::provider(&self.name, format!("response parse: {e}")))?;

        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        let response_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            provider = %self.name,
            model = %params.model,
            elapsed_ms = response_time_ms,
            chars = content.len(),
            "Provider call completed"
        );

        Ok(ProviderReply {
            content,
            model: params.model.clone(),
            response_time_ms,
        })
    }

    async fn is_available(&self) -> bool {
        // Local inference servers are typically keyless.
        self.api_key.is_some() || !self.base_url.contains("api.openai.com")
    }
}

/// Provider that is never available. Backs the offline profile, where every
/// ladder run resolves through the deterministic fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

#[async_trait]
impl GenerationProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn generate(&self, _prompt: &str, _params: &SamplingParams) -> StudioResult<ProviderReply> {
        Err(StudioError::provider("null", "provider is disabled"))
    }

    async fn is_available(&self) -> bool {
        false
    }
}

/// Rolling health for one provider, tracked across ladder runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub last_error: Option<String>,
    pub last_change: DateTime<Utc>,
}

impl ProviderHealth {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            consecutive_failures: 0,
            total_calls: 0,
            total_failures: 0,
            last_error: None,
            last_change: Utc::now(),
        }
    }

    pub fn record_success(&mut self) {
        self.total_calls += 1;
        if self.consecutive_failures > 0 {
            self.consecutive_failures = 0;
            self.last_error = None;
            self.last_change = Utc::now();
        }
    }

    pub fn record_failure(&mut self, error: &str) {
        self.total_calls += 1;
        self.total_failures += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
        self.last_change = Utc::now();
    }

    /// Three failures in a row marks the provider degraded.
    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures >= 3
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_calls as f64
        }
    }
}
