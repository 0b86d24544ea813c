//! Client for a local Ollama-compatible daemon: model listing, streamed
//! pulls and creates, deletion, and the loopback-resilient transport
//! underneath them.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output must go through the CLI layer or the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod fetch;
mod ndjson;
mod pull;
mod url;

pub use client::OllamaClient;
pub use fetch::send_resilient;
pub use ndjson::LineDecoder;
pub use ndjson::pull_event_stream;
pub use pull::PullEvent;
pub use pull::PullProgressReporter;
pub use url::host_root;
