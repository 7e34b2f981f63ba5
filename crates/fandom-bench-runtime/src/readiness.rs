//! Provider readiness resolution.
//!
//! Every configured provider is turned into either a ready [`ChatClient`]
//! or a skipped status with a reason. Failures never abort resolution of
//! the other providers; they only end up as status text on result rows.

use std::collections::{HashMap, HashSet};

use fandom_bench_core::{ProviderConfig, ProviderStatus, SetupReason};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::ChatClient;
use crate::providers::{ApiCredential, CompletionConfig, ProviderError, ProviderRegistry};
use crate::RuntimeError;

/// Why a chat client could not be built for one provider.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}: {detail}")]
pub struct ProviderSetupError {
    pub provider: String,
    pub reason: SetupReason,
    pub detail: String,
}

impl ProviderSetupError {
    pub fn new(provider: impl Into<String>, reason: SetupReason, detail: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            reason,
            detail: detail.into(),
        }
    }

    /// The skipped status this failure resolves to.
    pub fn status(&self) -> ProviderStatus {
        ProviderStatus::skipped(self.reason, self.detail.clone())
    }
}

/// Build a chat client for `config`.
///
/// Checks run in a fixed order and the first failure wins: registry
/// lookup, credential, compiled-in client, option validation, construction.
/// `temperature` is injected into the options unless they set their own.
pub fn build_chat_client(
    config: &ProviderConfig,
    registry: &ProviderRegistry,
    temperature: f64,
) -> Result<ChatClient, ProviderSetupError> {
    let key = config.provider.to_ascii_lowercase();
    let key = key.as_str();
    let fail = |reason, detail: String| ProviderSetupError::new(key, reason, detail);

    let spec = registry.spec(key).ok_or_else(|| {
        fail(
            SetupReason::UnsupportedProvider,
            format!("Provider '{}' is not registered", key),
        )
    })?;

    let options = merged_options(config, temperature);

    if let Some(env_var) = spec.credential_env.as_deref() {
        if !ApiCredential::is_available(&options, "api_key", env_var) {
            return Err(fail(
                SetupReason::MissingApiKey,
                format!("Set {} to enable this provider", env_var),
            ));
        }
    }

    let factory = registry.get_factory(key).ok_or_else(|| {
        let detail = match spec.feature.as_deref() {
            Some(feature) => format!(
                "Rebuild with the '{}' feature to use provider '{}'",
                feature, key
            ),
            None => format!("No client is registered for provider '{}'", key),
        };
        fail(SetupReason::MissingDependency, detail)
    })?;

    if config.options.contains_key("model") {
        return Err(fail(
            SetupReason::InvalidBinding,
            format!(
                "Option 'model' conflicts with the configured model '{}'",
                config.model
            ),
        ));
    }

    factory
        .validate_config(&options)
        .map_err(|e| fail(SetupReason::InvalidBinding, e.to_string()))?;

    let completion = CompletionConfig::from_options(config.model.clone(), &options)
        .map_err(|e| fail(SetupReason::InvalidBinding, e.to_string()))?;

    let provider = factory.create(&options).map_err(|e| match e {
        ProviderError::MissingCredential { .. } => fail(SetupReason::MissingApiKey, e.to_string()),
        other => fail(SetupReason::InitFailed, other.to_string()),
    })?;

    Ok(ChatClient::new(provider, completion))
}

/// Factory options: temperature first, then the config's own options,
/// then the model. A `model` option is rejected before this is used.
fn merged_options(config: &ProviderConfig, temperature: f64) -> JsonValue {
    let mut options = Map::new();
    options.insert("temperature".to_string(), JsonValue::from(temperature));
    for (key, value) in &config.options {
        options.insert(key.clone(), value.clone());
    }
    options.insert("model".to_string(), JsonValue::from(config.model.clone()));
    JsonValue::Object(options)
}

/// First label used by more than one config, if any.
pub fn find_duplicate_label(configs: &[ProviderConfig]) -> Option<String> {
    let mut seen = HashSet::new();
    configs
        .iter()
        .map(ProviderConfig::label)
        .find(|label| !seen.insert(label.clone()))
}

#[derive(Debug)]
struct Entry {
    label: String,
    model: String,
    status: ProviderStatus,
    client: Option<ChatClient>,
}

/// Immutable outcome of resolving every configured provider.
///
/// Built once before any record is processed and only read afterwards.
#[derive(Debug)]
pub struct Readiness {
    entries: Vec<Entry>,
    by_label: HashMap<String, usize>,
}

impl Readiness {
    /// Resolve every config against `registry`.
    ///
    /// In dry-run mode nothing is constructed and every label is
    /// [`ProviderStatus::DryRun`]. Duplicate labels are rejected.
    pub fn resolve(
        configs: &[ProviderConfig],
        registry: &ProviderRegistry,
        temperature: f64,
        dry_run: bool,
    ) -> Result<Self, RuntimeError> {
        if let Some(label) = find_duplicate_label(configs) {
            return Err(RuntimeError::DuplicateLabel(label));
        }

        let mut entries = Vec::with_capacity(configs.len());
        for config in configs {
            let label = config.label();

            let (status, client) = if dry_run {
                (ProviderStatus::DryRun, None)
            } else {
                match build_chat_client(config, registry, temperature) {
                    Ok(client) => {
                        info!(provider = %label, model = %config.model, "provider ready");
                        (ProviderStatus::Ready, Some(client))
                    }
                    Err(e) => {
                        warn!(
                            provider = %label,
                            reason = %e.reason,
                            detail = %e.detail,
                            "provider skipped"
                        );
                        (e.status(), None)
                    }
                }
            };

            entries.push(Entry {
                label,
                model: config.model.clone(),
                status,
                client,
            });
        }

        let by_label = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.label.clone(), i))
            .collect();

        Ok(Self { entries, by_label })
    }

    /// Labels in configured order.
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    /// Every label with its status, in configured order.
    pub fn statuses(&self) -> Vec<(String, ProviderStatus)> {
        self.entries
            .iter()
            .map(|e| (e.label.clone(), e.status.clone()))
            .collect()
    }

    pub fn status(&self, label: &str) -> Option<&ProviderStatus> {
        self.by_label.get(label).map(|&i| &self.entries[i].status)
    }

    pub fn client(&self, label: &str) -> Option<&ChatClient> {
        self.by_label
            .get(label)
            .and_then(|&i| self.entries[i].client.as_ref())
    }

    /// `(label, model, client)` for every ready provider.
    pub fn ready(&self) -> impl Iterator<Item = (&str, &str, &ChatClient)> {
        self.entries.iter().filter_map(|e| {
            e.client
                .as_ref()
                .map(|c| (e.label.as_str(), e.model.as_str(), c))
        })
    }

    /// `(label, model, status)` for every provider without a client.
    pub fn unready(&self) -> impl Iterator<Item = (&str, &str, &ProviderStatus)> {
        self.entries
            .iter()
            .filter(|e| e.client.is_none())
            .map(|e| (e.label.as_str(), e.model.as_str(), &e.status))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
