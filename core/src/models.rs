//! Domain types mirrored from the local model daemon.
//!
//! The daemon owns the lifecycle of every model; this crate only observes. A
//! `list` call is the single source of truth and nothing here is cached
//! beyond the unified registry the application chooses to persist.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// One model installed on the local daemon, as reported by its tags endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Unique human-readable identifier. May carry a `:tag` suffix; absence
    /// of a tag implies an implicit `:latest`.
    pub name: String,

    /// Content-derived identifier, stable across renames. Used as a list key.
    pub digest: String,

    /// Size in bytes.
    pub size: u64,

    /// Last-modified timestamp, used only for sort ordering.
    pub modified_at: DateTime<Utc>,

    /// Nested descriptive fields, passed through untouched.
    #[serde(default)]
    pub details: ModelDetails,
}

/// Opaque descriptive fields reported alongside a model. These are
/// pass-through strings for display; nothing in here is parsed further.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub parameter_size: String,
    #[serde(default)]
    pub quantization_level: String,
}

/// Sort models most-recently-modified first, the order the manager UI shows.
pub fn sort_most_recent_first(models: &mut [ModelEntry]) {
    models.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
}

/// A single streamed progress record from a pull or create operation.
///
/// Ephemeral: one instance per decoded NDJSON line, handed to the consumer
/// and discarded. `completed` and `total` come as a pair or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullProgress {
    /// Free-text phase label, e.g. "pulling manifest", "verifying sha256
    /// digest", "success".
    pub status: String,

    pub completed: Option<u64>,
    pub total: Option<u64>,
}

impl PullProgress {
    /// Percentage in `0.0..=100.0` when both byte counters are present.
    pub fn percentage(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                Some((completed as f64 / total as f64) * 100.0)
            }
            _ => None,
        }
    }
}
