//! Fixed catalog of provider keys the benchmarker knows about.
//!
//! A catalog entry says which credential a provider needs and which cargo
//! feature compiles its client in. Whether a client is actually available
//! is decided by the [`ProviderRegistry`](super::ProviderRegistry).

/// Description of one provider key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    /// Registry key (e.g. "openai")
    pub key: String,

    /// Environment variable holding the API key, if one is required
    pub credential_env: Option<String>,

    /// Cargo feature that compiles this provider's client in
    pub feature: Option<String>,

    /// Human-readable description
    pub description: String,
}

impl ProviderSpec {
    /// Spec for a provider that needs no credential and no feature.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            credential_env: None,
            feature: None,
            description: String::new(),
        }
    }

    /// Require a credential in `env_var` (or the `api_key` option).
    pub fn with_credential_env(mut self, env_var: impl Into<String>) -> Self {
        self.credential_env = Some(env_var.into());
        self
    }

    /// Name the cargo feature that provides the client.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

struct CatalogEntry {
    key: &'static str,
    env_var: &'static str,
    feature: &'static str,
    description: &'static str,
}

const CATALOG: [CatalogEntry; 5] = [
    CatalogEntry {
        key: "openai",
        env_var: "OPENAI_API_KEY",
        feature: "openai",
        description: "OpenAI Chat Completions",
    },
    CatalogEntry {
        key: "anthropic",
        env_var: "ANTHROPIC_API_KEY",
        feature: "anthropic",
        description: "Anthropic Messages API",
    },
    CatalogEntry {
        key: "cohere",
        env_var: "COHERE_API_KEY",
        feature: "cohere",
        description: "Cohere v2 Chat",
    },
    CatalogEntry {
        key: "mistral",
        env_var: "MISTRAL_API_KEY",
        feature: "openai",
        description: "Mistral (OpenAI-compatible endpoint)",
    },
    CatalogEntry {
        key: "groq",
        env_var: "GROQ_API_KEY",
        feature: "openai",
        description: "Groq (OpenAI-compatible endpoint)",
    },
];

/// Specs for every built-in provider key.
pub fn builtin_specs() -> Vec<ProviderSpec> {
    CATALOG
        .iter()
        .map(|entry| {
            ProviderSpec::new(entry.key)
                .with_credential_env(entry.env_var)
                .with_feature(entry.feature)
                .with_description(entry.description)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_specs_cover_catalog() {
        let specs = builtin_specs();
        let keys: Vec<&str> = specs.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["openai", "anthropic", "cohere", "mistral", "groq"]);
        assert!(specs.iter().all(|s| s.credential_env.is_some()));
    }

    #[test]
    fn test_compatible_endpoints_share_openai_feature() {
        let specs = builtin_specs();
        for key in ["mistral", "groq"] {
            let spec = specs.iter().find(|s| s.key == key).unwrap();
            assert_eq!(spec.feature.as_deref(), Some("openai"));
        }
    }
}
