//! Provider factory pattern for selecting an LLM backend by name.
//!
//! A panel configuration names its backend (`provider: ollama`) and carries
//! a provider-specific JSON settings block. Factories turn that block into a
//! provider instance.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let settings = serde_json::json!({"host": "http://localhost:11434"});
//! let provider = registry.create("ollama", &settings)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};

/// Factory for creating LLM providers from configuration.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "ollama".
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from JSON settings.
    fn create(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Validate settings without creating a provider.
    fn validate_config(&self, settings: &JsonValue) -> Result<(), ProviderError>;
}

/// Registry of available provider factories, keyed by type name.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Create a provider from type name and settings.
    pub fn create(
        &self,
        provider_type: &str,
        settings: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factory(provider_type)?;
        factory.validate_config(settings)?;
        factory.create(settings)
    }

    /// Validate settings for a provider type.
    pub fn validate(
        &self,
        provider_type: &str,
        settings: &JsonValue,
    ) -> Result<(), ProviderError> {
        self.factory(provider_type)?.validate_config(settings)
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider type is registered.
    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// Create a registry with all built-in providers registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::OllamaProviderFactory));
        registry
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse, TokenUsage};
    use async_trait::async_trait;

    struct MockProvider {
        name: String,
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: "{}".to_string(),
                usage: TokenUsage::default(),
                model: "mock".to_string(),
                stop_reason: Some("stop".to_string()),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct MockProviderFactory;

    impl ProviderFactory for MockProviderFactory {
        fn provider_type(&self) -> &'static str {
            "mock"
        }

        fn create(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            let name = settings["name"]
                .as_str()
                .unwrap_or("mock-provider")
                .to_string();
            Ok(Arc::new(MockProvider { name }))
        }

        fn validate_config(&self, settings: &JsonValue) -> Result<(), ProviderError> {
            if settings.get("broken").is_some() {
                return Err(ProviderError::NotConfigured("broken settings".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_registry_register_and_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));

        assert!(registry.has_provider("mock"));
        assert!(!registry.has_provider("unknown"));

        let provider = registry
            .create("mock", &serde_json::json!({"name": "test-mock"}))
            .unwrap();
        assert_eq!(provider.name(), "test-mock");
    }

    #[test]
    fn test_registry_create_validates_first() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));

        let result = registry.create("mock", &serde_json::json!({"broken": true}));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_registry_unknown_provider() {
        let registry = ProviderRegistry::new();
        match registry.create("unknown", &serde_json::json!({})) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("Unknown provider type"));
            }
            _ => panic!("Expected NotConfigured error"),
        }
    }

    #[test]
    fn test_registry_available_types() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.available_types().is_empty());

        registry.register(Arc::new(MockProviderFactory));
        assert_eq!(registry.available_types(), vec!["mock"]);
    }

    #[test]
    fn test_registry_validate_without_creating() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProviderFactory));

        assert!(registry.validate("mock", &serde_json::json!({})).is_ok());
        assert!(matches!(
            registry.validate("mock", &serde_json::json!({"broken": true})),
            Err(ProviderError::NotConfigured(_))
        ));
        assert!(registry.validate("unknown", &serde_json::json!({})).is_err());
    }

    #[test]
    fn test_defaults_include_ollama() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.has_provider("ollama"));
        assert!(registry
            .validate("ollama", &serde_json::json!({"host": "localhost:11434"}))
            .is_err());
    }
}
