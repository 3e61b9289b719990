use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub google_api_key: String,
    pub openai_api_key: String,
    pub base_url: Option<String>,
    /// Whole-request timeout for provider calls
    pub timeout_secs: u64,
}

// Keys stay out of the startup log line.
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("google_api_key", &mask(&self.google_api_key))
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LLMConfig {
    /// API key for the configured provider
    pub fn api_key(&self) -> &str {
        match self.provider {
            LLMProvider::Google => &self.google_api_key,
            LLMProvider::OpenAI => &self.openai_api_key,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Rows shown in the upload preview
    pub preview_rows: usize,
    /// Data rows of the uploaded file handed to the agent with each question
    pub agent_context_rows: usize,
    pub max_upload_bytes: usize,
    pub upload_dir: PathBuf,
    /// Live sessions kept in memory; the oldest is evicted beyond this
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
}

fn mask(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<set>"
    }
}

fn parse_var<T>(name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}", name))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let provider = env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "google".to_string())
            .parse::<LLMProvider>()
            .context("Invalid value for LLM_PROVIDER")?;

        Ok(Self {
            server: ServerConfig {
                port: parse_var("PORT", "3000")?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            llm: LLMConfig {
                provider,
                model: env::var("LLM_MODEL").unwrap_or_else(|_| default_model(provider).to_string()),
                temperature: parse_var("LLM_TEMPERATURE", "0.3")?,
                max_tokens: env::var("LLM_MAX_TOKENS")
                    .ok()
                    .map(|v| v.trim().parse::<u32>())
                    .transpose()
                    .context("Invalid value for LLM_MAX_TOKENS")?,
                google_api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                base_url: env::var("LLM_BASE_URL").ok().filter(|s| !s.is_empty()),
                timeout_secs: parse_var("LLM_TIMEOUT_SECS", "120")?,
            },
            data: DataConfig {
                preview_rows: parse_var("PREVIEW_ROWS", "5")?,
                agent_context_rows: parse_var("AGENT_CONTEXT_ROWS", "200")?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", "209715200")?,
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| env::temp_dir()),
                max_sessions: parse_var("MAX_SESSIONS", "100")?,
            },
            logging: LoggingConfig {
                log_dir: env::var("LOG_DIR").ok().map(PathBuf::from),
            },
        })
    }
}

pub fn default_model(provider: LLMProvider) -> &'static str {
    match provider {
        LLMProvider::Google => "gemini-pro",
        LLMProvider::OpenAI => "gpt-4o-mini",
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit tests; never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            llm: LLMConfig {
                provider: LLMProvider::Google,
                model: "gemini-pro".to_string(),
                temperature: 0.3,
                max_tokens: None,
                google_api_key: "test-key".to_string(),
                openai_api_key: String::new(),
                base_url: None,
                timeout_secs: 5,
            },
            data: DataConfig {
                preview_rows: 5,
                agent_context_rows: 200,
                max_upload_bytes: 1024 * 1024,
                upload_dir: env::temp_dir(),
                max_sessions: 10,
            },
            logging: LoggingConfig { log_dir: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models() {
        assert_eq!(default_model(LLMProvider::Google), "gemini-pro");
        assert_eq!(default_model(LLMProvider::OpenAI), "gpt-4o-mini");
    }

    #[test]
    fn test_api_key_follows_provider() {
        let mut config = Config::for_tests();
        assert_eq!(config.llm.api_key(), "test-key");

        config.llm.provider = LLMProvider::OpenAI;
        config.llm.openai_api_key = "sk-test".to_string();
        assert_eq!(config.llm.api_key(), "sk-test");
    }

    #[test]
    fn test_debug_masks_keys() {
        let config = Config::for_tests();
        let rendered = format!("{:?}", config.llm);
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("<set>"));
    }
}
