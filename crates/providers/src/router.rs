//! Provider selection: builds the configured backend.

use std::sync::Arc;

use specplan_config::AppConfig;
use specplan_core::error::AppError;
use specplan_core::provider::Provider;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider named by `config.provider`.
///
/// Every backend except local ones needs an API key; a missing key is a
/// `CONFIG_ERROR` here rather than an authentication failure mid-run.
pub fn build_from_config(config: &AppConfig) -> specplan_core::Result<Arc<dyn Provider>> {
    let name = config.provider.as_str();
    let api_key = config.api_key.clone().unwrap_or_default();

    if api_key.is_empty() && !is_local(name) {
        return Err(AppError::config(format!(
            "No API key configured for provider '{name}'. Set SPECPLAN_API_KEY or api_key in the config file."
        )));
    }

    let provider: Arc<dyn Provider> = if name == "anthropic" {
        let mut p = AnthropicProvider::new(&api_key)?;
        if let Some(url) = &config.api_url {
            p = p.with_base_url(url);
        }
        Arc::new(p)
    } else {
        let base_url = match &config.api_url {
            Some(url) => url.clone(),
            None => default_base_url(name).ok_or_else(|| {
                AppError::config(format!(
                    "Unknown provider '{name}'. Set api_url for OpenAI-compatible endpoints."
                ))
            })?,
        };
        let key = if api_key.is_empty() { name.to_string() } else { api_key };
        Arc::new(OpenAiCompatProvider::new(name, base_url, key)?)
    };

    tracing::debug!(provider = name, model = %config.model, "Provider selected");
    Ok(provider)
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "openai" => "https://api.openai.com/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use specplan_core::error::ErrorCode;

    fn config(provider: &str, key: Option<&str>) -> AppConfig {
        AppConfig {
            provider: provider.into(),
            api_key: key.map(String::from),
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn builds_openai_with_key() {
        let provider = build_from_config(&config("openai", Some("sk-test"))).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn builds_anthropic_natively() {
        let provider = build_from_config(&config("anthropic", Some("sk-ant"))).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = build_from_config(&config("openai", None)).err().unwrap();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }

    #[test]
    fn local_provider_needs_no_key() {
        assert!(build_from_config(&config("ollama", None)).is_ok());
    }

    #[test]
    fn unknown_provider_needs_url() {
        let err = build_from_config(&config("mystery", Some("k"))).err().unwrap();
        assert!(err.message.contains("api_url"));

        let mut with_url = config("mystery", Some("k"));
        with_url.api_url = Some("http://localhost:9000/v1".into());
        assert_eq!(build_from_config(&with_url).unwrap().name(), "mystery");
    }
}
