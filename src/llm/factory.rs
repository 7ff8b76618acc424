//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{Result, Text2SqlError};
use crate::llm::ollama::DEFAULT_OLLAMA_URL;
use crate::llm::openai::DEFAULT_BASE_URL;
use crate::llm::{
    LlmClient, LlmProvider, MockLlmClient, OllamaClient, OllamaConfig, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client from configuration.
///
/// If `api_key` is provided, it takes precedence over `OPENAI_API_KEY`.
/// The model comes from the config, then `OPENAI_MODEL` / `OLLAMA_MODEL`, then
/// the provider default. Ollama reads its base URL from `OLLAMA_URL` when the
/// config leaves it unset.
pub fn create_client(config: &LlmConfig, api_key: Option<String>) -> Result<Box<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(Text2SqlError::config)?;

    match provider {
        LlmProvider::OpenAi => {
            let key = api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    Text2SqlError::config("No API key configured. Set OPENAI_API_KEY.")
                })?;
            let model = resolve_model(config, provider, "OPENAI_MODEL");
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

            let client_config = OpenAiConfig::new(key, model)
                .with_base_url(base_url)
                .with_sampling(config.temperature, config.max_tokens)
                .with_timeout(config.timeout_secs);
            Ok(Box::new(OpenAiClient::new(client_config)?))
        }
        LlmProvider::Ollama => {
            let model = resolve_model(config, provider, "OLLAMA_MODEL");
            let base_url = config
                .base_url
                .clone()
                .or_else(|| std::env::var("OLLAMA_URL").ok())
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

            let client_config = OllamaConfig::new(model)
                .with_url(base_url)
                .with_sampling(config.temperature, config.max_tokens)
                .with_timeout(config.timeout_secs);
            Ok(Box::new(OllamaClient::new(client_config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

fn resolve_model(config: &LlmConfig, provider: LlmProvider, env_var: &str) -> String {
    config
        .model
        .clone()
        .or_else(|| std::env::var(env_var).ok())
        .unwrap_or_else(|| provider.default_model().to_string())
}
