//! Incremental NDJSON decoding for streamed progress responses.
//!
//! The daemon streams one JSON record per line, but HTTP chunk boundaries
//! fall wherever they like, including mid-line. [`LineDecoder`] owns the
//! framing: bytes go in, complete newline-terminated lines come out as parsed
//! records, and whatever trails the last newline stays buffered for the next
//! chunk. A line that fails to parse is dropped without failing the stream;
//! partial-line artifacts are expected, not exceptional.

use bytes::Bytes;
use bytes::BytesMut;
use futures::Stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::pull::PullEvent;
use crate::pull::event_from_record;

/// Newline-framed JSON decoder. Records are produced in exactly the order
/// their lines arrived; the only buffering is the unterminated tail.
#[derive(Default)]
pub struct LineDecoder {
    buf: BytesMut,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record whose line is now complete.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<JsonValue> {
        self.buf.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            let Ok(text) = std::str::from_utf8(&line) else {
                debug!("skipping non-UTF-8 stream line");
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<JsonValue>(text) {
                Ok(value) => records.push(value),
                // Expected for lines split across chunk boundaries.
                Err(_) => debug!("skipping unparseable stream line: {text}"),
            }
        }
        records
    }
}

/// Adapt a streamed response body into a finite sequence of pull events.
///
/// The sequence ends when the body ends, when a record reports `success`, or
/// when a record carries an `error` field; the terminal event is the last one
/// yielded. A transport error mid-stream simply ends the sequence, matching
/// how an abandoned body reader behaves.
pub fn pull_event_stream<S>(body: S) -> BoxStream<'static, PullEvent>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let mut body = Box::pin(body);
    let mut decoder = LineDecoder::new();

    let events = async_stream::stream! {
        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("progress stream ended on transport error: {e}");
                    return;
                }
            };
            for value in decoder.feed(&bytes) {
                let Some(event) = event_from_record(&value) else {
                    continue;
                };
                let terminal = matches!(event, PullEvent::Success | PullEvent::Error(_));
                yield event;
                if terminal {
                    return;
                }
            }
        }
    };

    Box::pin(events)
}
