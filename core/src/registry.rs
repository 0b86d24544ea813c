//! The unified, provider-agnostic model list and its reconciliation.
//!
//! The list itself is owned by the application shell; nothing in this module
//! mutates it in place. [`reconcile`] is the only sanctioned way to fold a
//! fresh daemon listing into it, and it always returns a new list for the
//! owner to adopt.

use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;

use crate::models::ModelEntry;
use crate::provider::ProviderKind;

/// One selectable inference target, unioned across every provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedModel {
    /// Stable identifier. For daemon-sourced models this is derived from the
    /// provider tag and model name, so a re-sync produces the same id and a
    /// persisted selection survives it.
    pub id: String,

    /// Which provider serves this model.
    pub provider: ProviderKind,

    /// Provider-specific model identifier to send in inference requests.
    pub model_name: String,

    /// Fully-qualified base URL for inference calls against this model.
    pub api_url: String,
}

impl UnifiedModel {
    pub fn new(provider: ProviderKind, model_name: &str, api_url: &str) -> Self {
        Self {
            id: format!("{}-{model_name}", provider.tag()),
            provider,
            model_name: model_name.to_string(),
            api_url: api_url.to_string(),
        }
    }
}

/// Fold a fresh daemon listing for `provider` into `current`.
///
/// Every entry previously synced from `provider` is dropped; entries from
/// other providers are retained unchanged, in their original relative order,
/// followed by the freshly-mapped entries. Inference for daemon models goes
/// through the OpenAI-compatible surface, hence the `/v1` suffix.
///
/// Pure and idempotent: unchanged daemon state reconciles to an identical
/// list, and no `(provider, model_name)` pair appears twice in the output.
pub fn reconcile(
    current: &[UnifiedModel],
    provider: ProviderKind,
    fresh: &[ModelEntry],
    base_url: &str,
) -> Vec<UnifiedModel> {
    let api_url = format!("{}/v1", base_url.trim_end_matches('/'));
    let mapped: Vec<UnifiedModel> = fresh
        .iter()
        .map(|entry| UnifiedModel::new(provider, &entry.name, &api_url))
        .collect();
    replace_provider(current, provider, mapped)
}

/// Replace every entry of `provider` in `current` with `fresh`, already in
/// unified form. The merge underneath [`reconcile`], also used directly for
/// catalogue-backed providers that produce [`UnifiedModel`]s themselves.
pub fn replace_provider(
    current: &[UnifiedModel],
    provider: ProviderKind,
    fresh: Vec<UnifiedModel>,
) -> Vec<UnifiedModel> {
    let mut seen: HashSet<(ProviderKind, String)> = HashSet::new();
    let mut next: Vec<UnifiedModel> = current
        .iter()
        .filter(|m| m.provider != provider)
        .filter(|m| seen.insert((m.provider, m.model_name.clone())))
        .cloned()
        .collect();

    for model in fresh {
        if model.provider == provider && seen.insert((provider, model.model_name.clone())) {
            next.push(model);
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelDetails;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn daemon_entry(name: &str, digest: &str) -> ModelEntry {
        ModelEntry {
            name: name.to_string(),
            digest: digest.to_string(),
            size: 0,
            modified_at: Utc::now(),
            details: ModelDetails::default(),
        }
    }

    #[test]
    fn replaces_provider_entries_and_preserves_the_rest() {
        let gemini = UnifiedModel::new(
            ProviderKind::Gemini,
            "gemini-2.0-flash",
            "https://generativelanguage.googleapis.com/v1beta/openai",
        );
        let stale = UnifiedModel::new(
            ProviderKind::Ollama,
            "phi3:latest",
            "http://127.0.0.1:11434/v1",
        );
        let current = vec![gemini.clone(), stale];

        let fresh = vec![
            daemon_entry("llama3.2:latest", "abc"),
            daemon_entry("mistral:latest", "def"),
        ];
        let next = reconcile(
            &current,
            ProviderKind::Ollama,
            &fresh,
            "http://127.0.0.1:11434",
        );

        assert_eq!(next.len(), 3);
        assert_eq!(next[0], gemini);
        assert_eq!(next[1].id, "ollama-llama3.2:latest");
        assert_eq!(next[1].api_url, "http://127.0.0.1:11434/v1");
        assert_eq!(next[2].model_name, "mistral:latest");
    }

    #[test]
    fn empty_fresh_list_clears_the_provider() {
        let current = vec![
            UnifiedModel::new(ProviderKind::Ollama, "phi3:latest", "http://127.0.0.1:11434/v1"),
            UnifiedModel::new(ProviderKind::Gemini, "gemini-2.0-flash", "https://g"),
        ];
        let next = reconcile(&current, ProviderKind::Ollama, &[], "http://127.0.0.1:11434");
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].provider, ProviderKind::Gemini);

        // With no entries from that provider left, a second pass is a no-op.
        let again = reconcile(&next, ProviderKind::Ollama, &[], "http://127.0.0.1:11434");
        assert_eq!(again, next);
    }

    #[test]
    fn repeated_reconcile_reaches_a_fixed_point() {
        let current = vec![UnifiedModel::new(
            ProviderKind::Gemini,
            "gemini-2.0-flash",
            "https://g",
        )];
        let fresh = vec![daemon_entry("llama3.2:latest", "abc")];

        let once = reconcile(&current, ProviderKind::Ollama, &fresh, "http://127.0.0.1:11434");
        let twice = reconcile(&once, ProviderKind::Ollama, &fresh, "http://127.0.0.1:11434");
        let thrice = reconcile(&twice, ProviderKind::Ollama, &fresh, "http://127.0.0.1:11434");
        assert_eq!(once, twice);
        assert_eq!(twice, thrice);
    }

    #[test]
    fn duplicate_daemon_names_collapse_to_one_entry() {
        let fresh = vec![
            daemon_entry("llama3.2:latest", "abc"),
            daemon_entry("llama3.2:latest", "abc"),
        ];
        let next = reconcile(&[], ProviderKind::Ollama, &fresh, "http://127.0.0.1:11434");
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn replace_provider_ignores_fresh_entries_from_other_providers() {
        let fresh = vec![
            UnifiedModel::new(ProviderKind::Gemini, "gemini-2.0-flash", "https://g"),
            UnifiedModel::new(ProviderKind::Ollama, "llama3.2:latest", "http://l/v1"),
        ];
        let next = replace_provider(&[], ProviderKind::Ollama, fresh);
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].provider, ProviderKind::Ollama);
    }

    #[test]
    fn trailing_slash_on_base_url_does_not_double_up() {
        let fresh = vec![daemon_entry("mistral:latest", "def")];
        let next = reconcile(&[], ProviderKind::Ollama, &fresh, "http://127.0.0.1:11434/");
        assert_eq!(next[0].api_url, "http://127.0.0.1:11434/v1");
    }
}
