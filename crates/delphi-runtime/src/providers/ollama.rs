//! Ollama provider implementation.
//!
//! Talks to a local or remote Ollama server through `/api/chat` and
//! `/api/tags`. HTTP calls require the `ollama` feature; without it the
//! provider still builds from configuration but every call reports
//! `NotConfigured`.

use super::{
    factory::ProviderFactory, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
#[cfg(feature = "ollama")]
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

#[cfg(feature = "ollama")]
const TAGS_TIMEOUT: Duration = Duration::from_secs(30);

/// Ollama chat provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    host: String,
    #[cfg(feature = "ollama")]
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the given host, e.g. `http://ollama:11434`.
    pub fn new(host: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            host: host.into().trim_end_matches('/').to_string(),
            #[cfg(feature = "ollama")]
            client: reqwest::Client::builder()
                .build()
                .map_err(|e| ProviderError::HttpError(e.to_string()))?,
        })
    }

    /// Create from JSON settings: `{"host": "..."}`, host optional.
    pub fn from_config(settings: &JsonValue) -> Result<Self, ProviderError> {
        let host = settings["host"].as_str().unwrap_or(DEFAULT_OLLAMA_HOST);
        Self::new(host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.host, path)
    }

    /// Names of the models the server has pulled.
    #[cfg(feature = "ollama")]
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .get(self.endpoint("tags"))
            .timeout(TAGS_TIMEOUT)
            .send()
            .await
            .map_err(|e| map_transport_error(e, TAGS_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(body.model_names())
    }

    #[cfg(not(feature = "ollama"))]
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::NotConfigured(
            "Ollama provider requires 'ollama' feature".to_string(),
        ))
    }
}

#[cfg(feature = "ollama")]
fn map_transport_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::HttpError(error.to_string())
    }
}

/// True when `model` is served, either by exact name or, for an untagged
/// name, as `<model>:latest`.
pub fn model_is_listed(names: &[String], model: &str) -> bool {
    if names.iter().any(|name| name == model) {
        return true;
    }
    !model.contains(':') && names.iter().any(|name| *name == format!("{model}:latest"))
}

/// Error for a model the server does not have.
pub fn missing_model_error(model: &str, names: &[String]) -> ProviderError {
    let available = if names.is_empty() {
        "<none>".to_string()
    } else {
        names.join(", ")
    };
    ProviderError::ModelUnavailable(format!(
        "Model '{model}' not found in Ollama. Available: {available}. Run: ollama pull {model}"
    ))
}

/// Ollama `/api/chat` request.
#[cfg_attr(not(feature = "ollama"), allow(dead_code))]
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: ChatOptions,
}

#[cfg_attr(not(feature = "ollama"), allow(dead_code))]
#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

#[cfg_attr(not(feature = "ollama"), allow(dead_code))]
impl<'a> ChatRequest<'a> {
    fn new(messages: &'a [ChatMessage], config: &'a CompletionConfig) -> Self {
        Self {
            model: &config.model,
            messages,
            stream: false,
            format: config.json_output.then_some("json"),
            options: ChatOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
                seed: config.seed,
            },
        }
    }
}

/// Ollama `/api/chat` response (non-streaming).
#[cfg_attr(not(feature = "ollama"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[cfg_attr(not(feature = "ollama"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl From<ChatResponse> for CompletionResponse {
    fn from(body: ChatResponse) -> Self {
        CompletionResponse {
            content: body.message.content,
            usage: TokenUsage {
                prompt_tokens: body.prompt_eval_count,
                completion_tokens: body.eval_count,
            },
            model: body.model,
            stop_reason: body.done_reason,
        }
    }
}

/// Ollama `/api/tags` response.
#[cfg_attr(not(feature = "ollama"), allow(dead_code))]
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<JsonValue>,
}

#[cfg_attr(not(feature = "ollama"), allow(dead_code))]
impl TagsResponse {
    /// Entries without a string `name` are skipped.
    fn model_names(&self) -> Vec<String> {
        self.models
            .iter()
            .filter_map(|m| m.get("name").and_then(JsonValue::as_str))
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    #[cfg(feature = "ollama")]
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = ChatRequest::new(&messages, config);

        let response = self
            .client
            .post(self.endpoint("chat"))
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: format!("Ollama request failed for model '{}': {}", config.model, body),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(body.into())
    }

    #[cfg(not(feature = "ollama"))]
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            "Ollama provider requires 'ollama' feature".to_string(),
        ))
    }

    async fn health_check(&self) -> bool {
        self.list_models().await.is_ok()
    }

    fn name(&self) -> &str {
        "ollama"
    }

    async fn ensure_model_available(&self, model: &str) -> Result<(), ProviderError> {
        let names = self.list_models().await?;
        if model_is_listed(&names, model) {
            return Ok(());
        }
        Err(missing_model_error(model, &names))
    }
}

/// Factory for creating Ollama providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "host": "http://localhost:11434"   // Optional
/// }
/// ```
pub struct OllamaProviderFactory;

impl ProviderFactory for OllamaProviderFactory {
    fn provider_type(&self) -> &'static str {
        "ollama"
    }

    fn create(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(OllamaProvider::from_config(settings)?))
    }

    fn validate_config(&self, settings: &JsonValue) -> Result<(), ProviderError> {
        match &settings["host"] {
            JsonValue::Null => Ok(()),
            JsonValue::String(url)
                if url.starts_with("http://") || url.starts_with("https://") =>
            {
                Ok(())
            }
            _ => Err(ProviderError::NotConfigured(
                "host must be a string starting with http:// or https://".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_model_match() {
        assert!(model_is_listed(&names(&["qwen3-4b", "llama3.2:latest"]), "qwen3-4b"));
    }

    #[test]
    fn test_untagged_model_matches_latest() {
        assert!(model_is_listed(&names(&["llama3.2:latest"]), "llama3.2"));
    }

    #[test]
    fn test_tagged_model_does_not_match_other_tag() {
        assert!(!model_is_listed(&names(&["llama3.2:latest"]), "llama3.2:1b"));
    }

    #[test]
    fn test_missing_model_error_lists_available() {
        let err = missing_model_error("qwen3-4b", &names(&["llama3.2:latest"]));
        let message = err.to_string();
        assert!(message.contains("Model 'qwen3-4b' not found"));
        assert!(message.contains("Available: llama3.2:latest"));
        assert!(message.contains("ollama pull qwen3-4b"));
    }

    #[test]
    fn test_missing_model_error_with_no_models() {
        let err = missing_model_error("qwen3-4b", &[]);
        assert!(err.to_string().contains("Available: <none>"));
    }

    #[test]
    fn test_host_trailing_slash_is_trimmed() {
        let provider = OllamaProvider::new("http://ollama:11434/").unwrap();
        assert_eq!(provider.host(), "http://ollama:11434");
        assert_eq!(provider.endpoint("chat"), "http://ollama:11434/api/chat");
    }

    #[test]
    fn test_from_config_defaults_host() {
        let provider = OllamaProvider::from_config(&serde_json::json!({})).unwrap();
        assert_eq!(provider.host(), DEFAULT_OLLAMA_HOST);
    }

    #[test]
    fn test_chat_request_serialization() {
        let messages = vec![ChatMessage::user("rate")];
        let config = CompletionConfig::default().json().with_seed(11);
        let request = ChatRequest::new(&messages, &config);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["stream"], false);
        assert_eq!(value["format"], "json");
        assert_eq!(value["options"]["seed"], 11);
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chat_request_omits_unset_seed_and_format() {
        let messages = vec![ChatMessage::user("rate")];
        let config = CompletionConfig::default();
        let value = serde_json::to_value(ChatRequest::new(&messages, &config)).unwrap();
        assert!(value.get("format").is_none());
        assert!(value["options"].get("seed").is_none());
    }

    #[test]
    fn test_chat_response_conversion() {
        let body: ChatResponse = serde_json::from_value(serde_json::json!({
            "model": "qwen3:4b",
            "message": {"role": "assistant", "content": "{\"rating\": 8}"},
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 40,
            "eval_count": 12
        }))
        .unwrap();
        let response: CompletionResponse = body.into();
        assert_eq!(response.content, "{\"rating\": 8}");
        assert_eq!(response.usage.total(), 52);
        assert_eq!(response.stop_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_tags_skip_entries_without_name() {
        let tags: TagsResponse = serde_json::from_value(serde_json::json!({
            "models": [{"name": "a"}, {"model": "b"}, "c", {"name": "d:latest"}]
        }))
        .unwrap();
        assert_eq!(tags.model_names(), names(&["a", "d:latest"]));
    }

    #[test]
    fn test_factory_rejects_bad_host() {
        let factory = OllamaProviderFactory;
        assert!(factory
            .validate_config(&serde_json::json!({"host": "ollama:11434"}))
            .is_err());
        assert!(factory
            .validate_config(&serde_json::json!({"host": "http://ollama:11434"}))
            .is_ok());
        assert!(factory.validate_config(&serde_json::json!({})).is_ok());
    }

    #[test]
    fn test_factory_creates_named_provider() {
        let provider = OllamaProviderFactory
            .create(&serde_json::json!({"host": "http://ollama:11434"}))
            .unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
