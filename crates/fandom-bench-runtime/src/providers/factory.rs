//! Provider factory pattern and the provider registry.
//!
//! The registry is the capability table the readiness resolver consults:
//! each provider key maps to a [`ProviderSpec`] and, when the client is
//! compiled in or registered explicitly, to a factory that builds it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = ProviderRegistry::with_defaults();
//! registry.register(Arc::new(MyProviderFactory));
//!
//! let provider = registry.create("my-provider", &config)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::catalog::{self, ProviderSpec};
use super::{LlmProvider, ProviderError};

/// Factory for creating LLM providers from configuration.
///
/// Each factory is responsible for:
/// 1. Validating its configuration format
/// 2. Creating provider instances
/// 3. Providing a unique type identifier
pub trait ProviderFactory: Send + Sync {
    /// Registry key this factory serves.
    ///
    /// Examples: "openai", "anthropic", "groq"
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from JSON configuration.
    ///
    /// The configuration holds the merged provider options, including
    /// `model` and `temperature`.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Validate configuration without creating a provider.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    /// Default configuration for this provider.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    /// Human-readable description of this provider.
    fn description(&self) -> &'static str {
        "LLM Provider"
    }
}

struct Binding {
    spec: ProviderSpec,
    factory: Option<Arc<dyn ProviderFactory>>,
}

/// Registry of known provider keys and their factories.
#[derive(Default)]
pub struct ProviderRegistry {
    bindings: BTreeMap<String, Binding>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a provider key without binding a factory.
    ///
    /// An existing factory for the key is kept.
    pub fn declare(&mut self, spec: ProviderSpec) {
        let key = spec.key.clone();
        match self.bindings.get_mut(&key) {
            Some(binding) => binding.spec = spec,
            None => {
                self.bindings.insert(key, Binding { spec, factory: None });
            }
        }
    }

    /// Bind a provider factory.
    ///
    /// Replaces any factory already bound to the same key. Keys that were
    /// never declared are declared with no credential requirement.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        let key = factory.provider_type().to_string();
        let binding = self.bindings.entry(key.clone()).or_insert_with(|| Binding {
            spec: ProviderSpec::new(key).with_description(factory.description()),
            factory: None,
        });
        binding.factory = Some(factory);
    }

    /// Create a provider from key and configuration.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.get_factory(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "Unknown provider type: '{}'. Available: {:?}",
                    provider_type,
                    self.available_types()
                ))
            })?
            .create(config)
    }

    /// Validate configuration for a provider key.
    pub fn validate(&self, provider_type: &str, config: &JsonValue) -> Result<(), ProviderError> {
        self.get_factory(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("Unknown provider type: '{}'", provider_type))
            })?
            .validate_config(config)
    }

    /// Keys with a factory bound.
    pub fn available_types(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|(_, b)| b.factory.is_some())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Every declared key, bound or not.
    pub fn known_types(&self) -> Vec<&str> {
        self.bindings.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a provider key is declared.
    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.bindings.contains_key(provider_type)
    }

    /// Spec for a declared key.
    pub fn spec(&self, provider_type: &str) -> Option<&ProviderSpec> {
        self.bindings.get(provider_type).map(|b| &b.spec)
    }

    /// Get the factory bound to a provider key.
    pub fn get_factory(&self, provider_type: &str) -> Option<&Arc<dyn ProviderFactory>> {
        self.bindings
            .get(provider_type)
            .and_then(|b| b.factory.as_ref())
    }

    /// Get default configuration for a provider key.
    pub fn default_config(&self, provider_type: &str) -> Option<JsonValue> {
        self.get_factory(provider_type).map(|f| f.default_config())
    }

    /// Registry with the whole catalog declared and every compiled-in
    /// client bound.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for spec in catalog::builtin_specs() {
            registry.declare(spec);
        }

        #[cfg(feature = "anthropic")]
        registry.register(Arc::new(super::AnthropicProviderFactory));

        #[cfg(feature = "cohere")]
        registry.register(Arc::new(super::CohereProviderFactory));

        #[cfg(feature = "openai")]
        for factory in super::OpenAiCompatibleFactory::all() {
            registry.register(Arc::new(factory));
        }

        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("known", &self.known_types())
            .field("available", &self.available_types())
            .finish()
    }
}
