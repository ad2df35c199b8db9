//! OpenAI chat completions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    non_empty, read_json, GenerationConfig, ModelProvider, ProviderError, DEFAULT_TIMEOUT,
};
use crate::analysis::prompts::{Prompt, PromptTier};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const MODEL: &str = "gpt-4";

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl<'a> ChatRequest<'a> {
    fn new(prompt: &'a Prompt, config: &GenerationConfig) -> Self {
        // Chat completions has no top_k.
        Self {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens.min(4096),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
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
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest::new(prompt, config))
            .send()
            .await?;

        let body: ChatResponse = read_json(response).await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ProviderError::EmptyContent)?;
        non_empty(text)
    }
}
