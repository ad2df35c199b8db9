//! Google Generative Language API (`models/{model}:generateContent`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{
    non_empty, read_json, GenerationConfig, ModelProvider, ProviderError, DEFAULT_TIMEOUT,
};
use crate::analysis::prompts::{Prompt, PromptTier};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const PREMIUM_MODEL: &str = "gemini-1.5-ultra";
pub const STANDARD_MODEL: &str = "gemini-1.5-pro";
pub const LITE_MODEL: &str = "gemini-1.5-flash";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: &'static str,
    tier: PromptTier,
    timeout: Duration,
}

impl GeminiProvider {
    /// High-capability model, asked for the full schema.
    pub fn premium(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model: PREMIUM_MODEL,
            tier: PromptTier::Full,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Standard model, asked for the simplified schema.
    pub fn standard(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model: STANDARD_MODEL,
            tier: PromptTier::Simplified,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Fast model, last in line, asked only for the minimal schema.
    pub fn lite(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            model: LITE_MODEL,
            tier: PromptTier::Minimal,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a Prompt, config: &GenerationConfig) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &prompt.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt.user }],
            }],
            generation_config: WireGenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_tokens,
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &str {
        self.model
    }

    fn tier(&self) -> PromptTier {
        self.tier
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::new(prompt, config))
            .send()
            .await?;

        let body: GenerateResponse = read_json(response).await?;
        non_empty(body.text().ok_or(ProviderError::EmptyContent)?)
    }
}
