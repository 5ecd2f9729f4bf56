//! Server-sent event framing for the bridge push feed.
//!
//! The bridge streams newline-delimited frames; the ones that matter look like
//! `data: [{"type":"update","data":[...]}]`. Chunks from the socket do not
//! respect line boundaries, so [`FrameDecoder`] buffers the trailing partial
//! line until the rest arrives. Comment lines (`: hi`), `id:` lines and
//! malformed payloads are skipped without failing the stream.

use std::pin::Pin;

use futures_util::Stream;

use crate::error::Error;
use crate::models::EventEntry;

/// A decoded stream of event batches. Each item is one `data:` frame.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Vec<EventEntry>, Error>> + Send>>;

/// Incremental line splitter + frame parser.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk, returning every complete batch it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<EventEntry>> {
        self.pending.extend_from_slice(chunk);

        let mut batches = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            if let Some(batch) = parse_data_line(text.trim_end_matches(['\r', '\n'])) {
                batches.push(batch);
            }
        }
        batches
    }

    /// Bytes buffered while waiting for a line terminator.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

/// Parse one frame line. Returns `None` for anything that is not a
/// well-formed `data:` frame.
pub fn parse_data_line(line: &str) -> Option<Vec<EventEntry>> {
    let payload = line.strip_prefix("data:")?.trim_start();
    match serde_json::from_str::<Vec<EventEntry>>(payload) {
        Ok(entries) => Some(entries),
        Err(e) => {
            tracing::debug!(error = %e, "dropping malformed event frame");
            None
        }
    }
}
