use sift_client::ContextPayload;

/// Marker the backend emits before switching the stream from answer text to
/// the context JSON blob. This is a wire contract with the deployment; there
/// is no escaping mechanism, so the marker is only honored at a chunk start.
pub const CONTEXT_SENTINEL: &str = "context:";

#[derive(Debug, PartialEq)]
pub enum DemuxEvent {
    /// Answer text to append to the trailing AI message as-is.
    Answer(String),
    /// The context blob parsed; collection is finished for this turn.
    Context(ContextPayload),
}

/// Splits one chat stream into the answer channel and the context channel.
///
/// Once the sentinel is seen, chunks accumulate in a buffer until the buffer
/// parses as JSON. A failed parse is not an error — it just means the blob is
/// still incomplete.
#[derive(Debug, Default)]
pub struct StreamDemux {
    context_buf: String,
    collecting: bool,
}

impl StreamDemux {
    pub fn push(&mut self, chunk: &str) -> Option<DemuxEvent> {
        if self.collecting {
            self.context_buf.push_str(chunk);
            self.try_commit()
        } else if let Some(rest) = chunk.strip_prefix(CONTEXT_SENTINEL) {
            self.collecting = true;
            self.context_buf.push_str(rest);
            self.try_commit()
        } else {
            Some(DemuxEvent::Answer(chunk.to_string()))
        }
    }

    fn try_commit(&mut self) -> Option<DemuxEvent> {
        match serde_json::from_str::<ContextPayload>(&self.context_buf) {
            Ok(payload) => {
                self.context_buf.clear();
                self.collecting = false;
                Some(DemuxEvent::Context(payload))
            }
            Err(_) => None,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Called when the stream ends. An unterminated context blob is dropped;
    /// answer text already emitted is unaffected.
    pub fn finish(&mut self) {
        if self.collecting {
            tracing::debug!(
                buffered = self.context_buf.len(),
                "stream ended mid-context, discarding partial blob"
            );
        }
        self.context_buf.clear();
        self.collecting = false;
    }
}
