//! Registry of inference providers the unified model list can draw from.
//!
//! Providers can be defined in two places:
//!   1. Built-in defaults compiled into the binary so modeldock works
//!      out-of-the-box.
//!   2. User-defined entries inside `~/.modeldock/config.toml` under the
//!      `providers` key. These override or extend the defaults at runtime.

use futures::future::BoxFuture;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::env::VarError;

use crate::error::EnvVarError;
use crate::registry::UnifiedModel;

/// Which family of service a provider entry describes. Dispatch happens on
/// this tag exactly once, when a [`ModelSource`] is selected for the entry;
/// nothing downstream compares provider names as strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini, reached through its OpenAI-compatible surface.
    Gemini,
    /// A local Ollama-compatible daemon. The only kind with a managed model
    /// lifecycle (pull/create/delete).
    #[default]
    Ollama,
    /// Any other endpoint speaking the OpenAI chat-completions schema.
    #[serde(rename = "openai")]
    OpenAiCompatible,
}

impl ProviderKind {
    /// Stable lowercase tag used in unified model ids and persisted state.
    pub fn tag(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAiCompatible => "openai",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Serializable representation of a provider definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderInfo {
    /// Friendly display name.
    pub name: String,
    /// Base URL for the provider's API.
    pub base_url: String,
    /// Environment variable that stores the user's API key for this provider.
    pub env_key: Option<String>,

    /// Optional instructions to help the user get a valid value for the
    /// variable and set it.
    pub env_key_instructions: Option<String>,

    /// Which family of service this entry describes.
    pub kind: ProviderKind,

    /// Fixed model catalogue for providers whose model set is configured
    /// rather than discovered. Ignored for the daemon kind, whose models are
    /// listed live.
    #[serde(default)]
    pub catalog: Vec<String>,
}

impl ProviderInfo {
    /// If `env_key` is Some, returns the API key for this provider if present
    /// (and non-empty) in the environment. If `env_key` is required but
    /// cannot be found, returns an error.
    pub fn api_key(&self) -> crate::error::Result<Option<String>> {
        match &self.env_key {
            Some(env_key) => std::env::var(env_key)
                .and_then(|v| {
                    if v.trim().is_empty() {
                        Err(VarError::NotPresent)
                    } else {
                        Ok(Some(v))
                    }
                })
                .map_err(|_| {
                    crate::error::DockErr::EnvVar(EnvVarError {
                        var: env_key.clone(),
                        instructions: self.env_key_instructions.clone(),
                    })
                }),
            None => Ok(None),
        }
    }
}

/// Built-in default provider list.
pub fn built_in_providers() -> HashMap<String, ProviderInfo> {
    use ProviderInfo as P;

    [
        (
            "gemini",
            P {
                name: "Gemini".into(),
                base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
                env_key: Some("GEMINI_API_KEY".into()),
                env_key_instructions: Some(
                    "Create an API key (https://aistudio.google.com) and export it as an environment variable.".into(),
                ),
                kind: ProviderKind::Gemini,
                catalog: vec!["gemini-2.0-flash".into(), "gemini-1.5-pro".into()],
            },
        ),
        (
            "ollama",
            P {
                name: "Ollama".into(),
                base_url: "http://127.0.0.1:11434".into(),
                env_key: None,
                env_key_instructions: None,
                kind: ProviderKind::Ollama,
                catalog: Vec::new(),
            },
        ),
        (
            "openai",
            P {
                name: "OpenAI-compatible".into(),
                base_url: "https://api.openai.com/v1".into(),
                env_key: Some("OPENAI_API_KEY".into()),
                env_key_instructions: None,
                kind: ProviderKind::OpenAiCompatible,
                catalog: Vec::new(),
            },
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Capability surface a provider contributes to the unified model list.
///
/// Implementations are selected once per provider entry; the daemon-backed
/// implementation lives in the `modeldock-ollama` crate, cloud providers use
/// [`StaticSource`].
pub trait ModelSource: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Enumerate the models this provider can currently serve, already mapped
    /// onto the unified representation.
    fn list_models(&self) -> BoxFuture<'_, crate::error::Result<Vec<UnifiedModel>>>;
}

/// A source backed by a fixed catalogue rather than a live listing endpoint.
/// Cloud providers whose model set is configured, not discovered, use this.
pub struct StaticSource {
    kind: ProviderKind,
    base_url: String,
    catalog: Vec<String>,
}

impl StaticSource {
    pub fn new(kind: ProviderKind, base_url: impl Into<String>, catalog: Vec<String>) -> Self {
        Self {
            kind,
            base_url: base_url.into(),
            catalog,
        }
    }

    pub fn from_provider(info: &ProviderInfo) -> Self {
        Self::new(info.kind, info.base_url.clone(), info.catalog.clone())
    }
}

impl ModelSource for StaticSource {
    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn list_models(&self) -> BoxFuture<'_, crate::error::Result<Vec<UnifiedModel>>> {
        Box::pin(async move {
            Ok(self
                .catalog
                .iter()
                .map(|name| UnifiedModel::new(self.kind, name, &self.base_url))
                .collect())
        })
    }
}
