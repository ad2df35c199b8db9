//! In-process provider for tests: replies, fails or hangs on every call, and counts calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{GenerationConfig, ModelProvider, ProviderError, DEFAULT_TIMEOUT};
use crate::analysis::prompts::{Prompt, PromptTier};

#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail,
    Hang,
}

pub struct ScriptedProvider {
    name: String,
    tier: PromptTier,
    timeout: Duration,
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str, tier: PromptTier, script: Script) -> Self {
        Self {
            name: name.to_string(),
            tier,
            timeout: DEFAULT_TIMEOUT,
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying(name: &str, tier: PromptTier, text: &str) -> Self {
        Self::new(name, tier, Script::Reply(text.to_string()))
    }

    pub fn failing(name: &str, tier: PromptTier) -> Self {
        Self::new(name, tier, Script::Fail)
    }

    pub fn hanging(name: &str, tier: PromptTier) -> Self {
        Self::new(name, tier, Script::Hang)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> PromptTier {
        self.tier
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn generate(
        &self,
        _prompt: &Prompt,
        _config: &GenerationConfig,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(ProviderError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            }),
            Script::Hang => std::future::pending().await,
        }
    }
}
