//! Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    non_empty, read_json, GenerationConfig, ModelProvider, ProviderError, DEFAULT_TIMEOUT,
};
use crate::analysis::prompts::{Prompt, PromptTier};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_k: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// Text of the first text block.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

impl<'a> MessagesRequest<'a> {
    fn new(prompt: &'a Prompt, config: &GenerationConfig) -> Self {
        Self {
            model: MODEL,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_k: config.top_k,
            system: &prompt.system,
            messages: vec![Message {
                role: "user",
                content: &prompt.user,
            }],
        }
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &str {
        MODEL
    }

    fn tier(&self) -> PromptTier {
        PromptTier::Full
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&MessagesRequest::new(prompt, config))
            .send()
            .await?;

        let body: MessagesResponse = read_json(response).await?;
        if let Some(usage) = &body.usage {
            debug!(
                "Anthropic call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        let text = body.text().ok_or(ProviderError::EmptyContent)?;
        non_empty(text.to_string())
    }
}
