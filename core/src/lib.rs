//! Root of the `modeldock-core` library.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output must go through the CLI layer or the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod config;
pub mod error;
mod models;
mod provider;
mod registry;
pub mod state;
pub mod store;

pub use error::DockErr;
pub use error::Result;
pub use error::user_facing_message;
pub use models::ModelDetails;
pub use models::ModelEntry;
pub use models::PullProgress;
pub use models::sort_most_recent_first;
pub use provider::ModelSource;
pub use provider::ProviderInfo;
pub use provider::ProviderKind;
pub use provider::StaticSource;
pub use provider::built_in_providers;
pub use registry::UnifiedModel;
pub use registry::reconcile;
pub use registry::replace_provider;
