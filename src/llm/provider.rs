use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::LLMConfig;
use crate::types::{AppError, AppResult, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider_name: String,
}

/// HTTP client shared by the provider adapters. `timeout` bounds the whole
/// request, connect through body.
pub fn http_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

impl LLM {
    pub fn new(config: &LLMConfig) -> AppResult<Self> {
        let api_key = config.api_key();
        let timeout = Duration::from_secs(config.timeout_secs);
        let adapter: Box<dyn LLMAdapter> = match (config.provider, config.base_url.as_deref()) {
            (LLMProvider::Google, None) => {
                Box::new(crate::llm::google::GoogleAdapter::new(api_key, timeout)?)
            }
            (LLMProvider::Google, Some(base)) => Box::new(
                crate::llm::google::GoogleAdapter::with_base_url(api_key, base, timeout)?,
            ),
            (LLMProvider::OpenAI, None) => {
                Box::new(crate::llm::openai::OpenAIAdapter::new(api_key, timeout)?)
            }
            (LLMProvider::OpenAI, Some(base)) => Box::new(
                crate::llm::openai::OpenAIAdapter::with_base_url(api_key, base, timeout)?,
            ),
        };

        Ok(Self {
            adapter,
            provider_name: config.provider.to_string(),
        })
    }

    /// Wrap an arbitrary adapter, e.g. a scripted one in tests.
    pub fn from_adapter(name: impl Into<String>, adapter: Box<dyn LLMAdapter>) -> Self {
        Self {
            adapter,
            provider_name: name.into(),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        debug!(
            provider = %self.provider_name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion"
        );
        self.adapter.create_chat_completion(request).await
    }
}
