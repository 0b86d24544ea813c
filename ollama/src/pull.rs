//! Typed events decoded from the daemon's streamed progress records.

use modeldock_core::PullProgress;
use serde_json::Value as JsonValue;
use std::io;

/// One decoded record from a pull or create stream.
///
/// `Success` and `Error` are terminal: the stream yields nothing after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullEvent {
    /// A non-terminal progress record. Byte counters are present while layers
    /// download, absent for status-only phases.
    Progress(PullProgress),
    /// The daemon reported the operation complete.
    Success,
    /// The daemon reported a failure in-stream. Empirically the HTTP response
    /// is still 200 OK in this case, so the record, not the status code, is
    /// what decides the outcome.
    Error(String),
}

/// Map one parsed NDJSON record onto an event. Returns `None` for records
/// that carry neither a status nor an error (nothing to report).
pub fn event_from_record(value: &JsonValue) -> Option<PullEvent> {
    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        return Some(PullEvent::Error(message.to_string()));
    }
    let status = value.get("status").and_then(|s| s.as_str())?;
    if status == "success" {
        return Some(PullEvent::Success);
    }
    Some(PullEvent::Progress(PullProgress {
        status: status.to_string(),
        completed: value.get("completed").and_then(|v| v.as_u64()),
        total: value.get("total").and_then(|v| v.as_u64()),
    }))
}

/// Consumer of pull events, threaded through the streaming drivers so the
/// decode loop stays independent of any particular frontend.
pub trait PullProgressReporter {
    fn on_event(&mut self, event: &PullEvent) -> io::Result<()>;
}
