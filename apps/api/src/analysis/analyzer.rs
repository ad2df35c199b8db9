//! Orchestrates one analysis: cache check, provider fallback chain, repair,
//! tier validation, normalization, caching.
//!
//! Every failure inside the chain is absorbed. The caller always gets a result
//! that satisfies the field contract, tagged with where it came from.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::cache::{CacheKey, ResponseCache};
use crate::analysis::fallback::{error_result, heuristic_result};
use crate::analysis::normalizer::normalize;
use crate::analysis::prompts::build_prompt;
use crate::analysis::repair::repair;
use crate::models::analysis::{AnalysisRequest, AnalysisResult};
use crate::providers::{invoke, InvokeError, ModelProvider};

/// Raw responses are logged up to this many characters when they cannot be repaired.
const RAW_LOG_CHARS: usize = 500;

const UNPARSEABLE_REASON: &str = "Could not parse malformed JSON from AI response";
const EMPTY_RESUME_REASON: &str = "No text could be extracted from the resume";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisSource {
    Cache,
    /// Name of the provider that answered.
    Provider(String),
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub source: AnalysisSource,
}

/// Why a single provider attempt was rejected.
#[derive(Debug, Error)]
pub enum AnalysisFailure {
    #[error("{provider} timed out after {}s", .timeout.as_secs())]
    ProviderTimeout { provider: String, timeout: Duration },

    #[error("{provider} failed: {message}")]
    ProviderError { provider: String, message: String },

    #[error("response from {provider} could not be repaired")]
    UnparseableResponse { provider: String },

    #[error("response from {provider} is missing required fields: {}", .missing.join(", "))]
    SchemaViolation {
        provider: String,
        missing: Vec<String>,
    },
}

impl From<InvokeError> for AnalysisFailure {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::Timeout { provider, timeout } => {
                AnalysisFailure::ProviderTimeout { provider, timeout }
            }
            InvokeError::Provider { provider, source } => AnalysisFailure::ProviderError {
                provider,
                message: source.to_string(),
            },
        }
    }
}

pub struct ResumeAnalyzer {
    cache: Arc<ResponseCache>,
    providers: Vec<Arc<dyn ModelProvider>>,
    max_attempts: usize,
}

impl ResumeAnalyzer {
    pub fn new(
        cache: Arc<ResponseCache>,
        providers: Vec<Arc<dyn ModelProvider>>,
        max_attempts: usize,
    ) -> Self {
        Self {
            cache,
            providers,
            max_attempts,
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        if request.resume_text().trim().is_empty() {
            warn!("resume text is empty, skipping model analysis");
            return AnalysisOutcome {
                result: error_result(EMPTY_RESUME_REASON),
                source: AnalysisSource::Fallback,
            };
        }

        let key = CacheKey::for_request(request);
        if let Some(result) = self.cache.get(&key) {
            debug!(key = key.as_str(), "analysis cache hit");
            return AnalysisOutcome {
                result,
                source: AnalysisSource::Cache,
            };
        }

        let mut last_failure = None;
        for provider in self.providers.iter().take(self.max_attempts) {
            match self.attempt(provider.as_ref(), request).await {
                Ok(result) => {
                    self.cache.put(key, result.clone());
                    info!(
                        provider = provider.name(),
                        cached_entries = self.cache.len(),
                        "analysis completed"
                    );
                    return AnalysisOutcome {
                        result,
                        source: AnalysisSource::Provider(provider.name().to_string()),
                    };
                }
                Err(failure) => {
                    warn!(error = %failure, "analysis attempt failed, trying next provider");
                    last_failure = Some(failure);
                }
            }
        }

        // Garbage from the last model gets a clearly-marked error result, which is
        // not cached. Anything else falls back to the keyword heuristic.
        let result = match last_failure {
            Some(AnalysisFailure::UnparseableResponse { .. }) => error_result(UNPARSEABLE_REASON),
            _ => {
                let result = heuristic_result(request);
                self.cache.put(key, result.clone());
                result
            }
        };
        warn!("all providers failed, returning fallback analysis");
        AnalysisOutcome {
            result,
            source: AnalysisSource::Fallback,
        }
    }

    async fn attempt(
        &self,
        provider: &dyn ModelProvider,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, AnalysisFailure> {
        let tier = provider.tier();
        let prompt = build_prompt(request, tier);
        let raw = invoke(provider, &prompt, provider.timeout()).await?;

        let repaired = repair(&raw).map_err(|_| {
            let preview: String = raw.chars().take(RAW_LOG_CHARS).collect();
            warn!(provider = provider.name(), raw = %preview, "unrepairable model response");
            AnalysisFailure::UnparseableResponse {
                provider: provider.name().to_string(),
            }
        })?;
        debug!(provider = provider.name(), stage = ?repaired.stage, "model response repaired");

        let missing: Vec<String> = tier
            .required_fields()
            .iter()
            .filter(|field| !repaired.value.contains_key(**field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisFailure::SchemaViolation {
                provider: provider.name().to_string(),
                missing,
            });
        }

        Ok(normalize(&Value::Object(repaired.value)))
    }
}
