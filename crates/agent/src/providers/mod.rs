//! Adapters from the provider-neutral transcript to concrete LLM APIs.

pub mod gemini;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use paydesk_core::config::{LlmConfig, LlmProvider};

use crate::error::LlmError;
use crate::llm::LlmClient;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| LlmError::Authentication("no llm api key is configured".to_string()))?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    let base_url = config.base_url.as_deref();

    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(http, base_url, &config.model, api_key)),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(http, base_url, &config.model, api_key)),
    };
    Ok(client)
}

/// Best-effort message from a provider error body; both APIs use
/// `{"error": {"message": ..}}`.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| {
            payload.pointer("/error/message").and_then(Value::as_str).map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use paydesk_core::config::{LlmConfig, LlmProvider};

    use super::{build_client, error_message};
    use crate::error::LlmErrorCategory;

    fn config(provider: LlmProvider, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: api_key.map(|key| SecretString::from(key.to_string())),
            base_url: None,
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn provider_selects_adapter() {
        let gemini = build_client(&config(LlmProvider::Gemini, Some("key"))).expect("gemini");
        assert_eq!(gemini.provider_name(), "gemini");
        assert_eq!(gemini.model(), "gemini-2.5-flash");

        let openai = build_client(&config(LlmProvider::OpenAi, Some("key"))).expect("openai");
        assert_eq!(openai.provider_name(), "openai");
    }

    #[test]
    fn missing_key_is_an_authentication_error() {
        let error = build_client(&config(LlmProvider::Gemini, None)).err().map(|error| error.category());
        assert_eq!(error, Some(LlmErrorCategory::Authentication));
    }

    #[test]
    fn error_message_prefers_structured_body() {
        assert_eq!(error_message(r#"{"error": {"code": 400, "message": "API key not valid"}}"#), "API key not valid");
        assert_eq!(error_message("  upstream exploded "), "upstream exploded");
    }
}
