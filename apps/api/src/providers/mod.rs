//! Model invocation adapter: every call to a generative model goes through here.
//!
//! Each provider variant accepts a rendered prompt and returns raw text. Adapters
//! never retry; trying the next provider is the analyzer's decision. `invoke`
//! wraps a call in a hard deadline and drops the in-flight request when it passes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::analysis::prompts::{Prompt, PromptTier};
use crate::config::Config;

pub mod anthropic;
pub mod gemini;
pub mod openai;
#[cfg(test)]
pub mod scripted;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Deadline for every built-in provider.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider returned empty content")]
    EmptyContent,
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("{provider} timed out after {}s", .timeout.as_secs())]
    Timeout { provider: String, timeout: Duration },

    #[error("{provider} failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            top_k: 30,
            max_tokens: 8192,
        }
    }
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Stable label used in logs and in the analysis source.
    fn name(&self) -> &str;
    /// Prompt tier this model is asked to fill.
    fn tier(&self) -> PromptTier;
    fn timeout(&self) -> Duration;
    fn config(&self) -> GenerationConfig {
        GenerationConfig::default()
    }
    async fn generate(
        &self,
        prompt: &Prompt,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError>;
}

/// Calls `provider` once, failing with [`InvokeError::Timeout`] after `timeout`.
pub async fn invoke(
    provider: &dyn ModelProvider,
    prompt: &Prompt,
    timeout: Duration,
) -> Result<String, InvokeError> {
    let config = provider.config();
    match tokio::time::timeout(timeout, provider.generate(prompt, &config)).await {
        Ok(Ok(text)) => {
            debug!(provider = provider.name(), chars = text.len(), "provider replied");
            Ok(text)
        }
        Ok(Err(source)) => Err(InvokeError::Provider {
            provider: provider.name().to_string(),
            source,
        }),
        Err(_) => Err(InvokeError::Timeout {
            provider: provider.name().to_string(),
            timeout,
        }),
    }
}

/// Provider chain in priority order, built from whichever API keys are configured.
pub fn build_chain(config: &Config, http: Client) -> Vec<Arc<dyn ModelProvider>> {
    let mut chain: Vec<Arc<dyn ModelProvider>> = Vec::new();

    if let Some(key) = &config.gemini_api_key {
        chain.push(Arc::new(GeminiProvider::premium(http.clone(), key.clone())));
    }
    if let Some(key) = &config.openai_api_key {
        chain.push(Arc::new(OpenAiProvider::new(http.clone(), key.clone())));
    }
    if let Some(key) = &config.anthropic_api_key {
        chain.push(Arc::new(AnthropicProvider::new(http.clone(), key.clone())));
    }
    if let Some(key) = &config.gemini_api_key {
        chain.push(Arc::new(GeminiProvider::standard(http.clone(), key.clone())));
        chain.push(Arc::new(GeminiProvider::lite(http, key.clone())));
    }
    chain
}

// ────────────────────────────────────────────────────────────────────────────
// Shared HTTP helpers
// ────────────────────────────────────────────────────────────────────────────

/// `{"error": {"message": ...}}`, the error body shape all three vendors use.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn api_error(status: u16, body: String) -> ProviderError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    ProviderError::Api { status, message }
}

/// Decodes a success body, or turns a non-2xx response into [`ProviderError::Api`].
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status.as_u16(), body));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

fn non_empty(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::EmptyContent)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedProvider;
    use super::*;

    fn prompt() -> Prompt {
        Prompt {
            system: "system".to_string(),
            user: "user".to_string(),
        }
    }

    #[test]
    fn test_api_error_extracts_vendor_message() {
        let err = api_error(
            401,
            r#"{"error": {"message": "invalid x-api-key", "type": "authentication_error"}}"#
                .to_string(),
        );
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid x-api-key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_keeps_raw_body_when_unstructured() {
        match api_error(502, "Bad Gateway".to_string()) {
            ProviderError::Api { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_content_rejected() {
        assert!(matches!(
            non_empty("  \n".to_string()),
            Err(ProviderError::EmptyContent)
        ));
        assert_eq!(non_empty("{}".to_string()).unwrap(), "{}");
    }

    #[test]
    fn test_chain_follows_priority_and_configured_keys() {
        let names = |config: &Config| -> Vec<String> {
            build_chain(config, Client::new())
                .iter()
                .map(|p| p.name().to_string())
                .collect()
        };

        let mut config = crate::config::tests::test_config();
        assert_eq!(names(&config), vec![openai::MODEL]);

        config.gemini_api_key = Some("g-key".into());
        config.anthropic_api_key = Some("a-key".into());
        assert_eq!(
            names(&config),
            vec![
                gemini::PREMIUM_MODEL,
                openai::MODEL,
                anthropic::MODEL,
                gemini::STANDARD_MODEL,
                gemini::LITE_MODEL
            ]
        );
    }

    #[tokio::test]
    async fn test_invoke_returns_reply() {
        let provider = ScriptedProvider::replying("fake", PromptTier::Full, "{\"a\": 1}");
        let text = invoke(&provider, &prompt(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(text, "{\"a\": 1}");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_invoke_wraps_provider_error() {
        let provider = ScriptedProvider::failing("broken", PromptTier::Full);
        let err = invoke(&provider, &prompt(), Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, InvokeError::Provider { ref provider, .. } if provider == "broken"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_times_out_hanging_provider() {
        let provider = ScriptedProvider::hanging("slow", PromptTier::Full);
        let err = invoke(&provider, &prompt(), Duration::from_secs(15)).await.unwrap_err();
        match err {
            InvokeError::Timeout { provider, timeout } => {
                assert_eq!(provider, "slow");
                assert_eq!(timeout, Duration::from_secs(15));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
