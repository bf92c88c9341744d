use std::collections::HashMap;

use sift_client::Reference;

use crate::message::{Message, Sender, TagSpan};

/// Ordered log of the conversation plus per-message annotations.
///
/// Append-only, except for the single trailing AI message, which is mutated
/// in place while its stream is live. All mutation goes through the methods
/// here so the invariants hold in one place.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    annotations: HashMap<usize, Vec<TagSpan>>,
    sentiments: HashMap<usize, String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn annotation(&self, index: usize) -> Option<&[TagSpan]> {
        self.annotations.get(&index).map(Vec::as_slice)
    }

    pub fn sentiment(&self, index: usize) -> Option<&str> {
        self.sentiments.get(&index).map(String::as_str)
    }

    pub fn push_human(&mut self, content: &str) -> usize {
        self.messages.push(Message::human(content));
        self.messages.len() - 1
    }

    /// Open a new empty AI message. Refused if the previous AI message was
    /// never finalized.
    pub fn begin_ai_turn(&mut self) -> Option<usize> {
        if self.streaming_ai().is_some() {
            tracing::warn!("begin_ai_turn while the previous AI message is still streaming");
            return None;
        }
        self.messages.push(Message::ai_streaming());
        Some(self.messages.len() - 1)
    }

    pub fn append_to_last_ai(&mut self, delta: &str) {
        match self.streaming_ai_mut() {
            Some(message) => message.content.push_str(delta),
            None => tracing::warn!("append_to_last_ai with no AI message streaming"),
        }
    }

    /// Close the trailing AI message, attaching its reference list. The
    /// displayed content is whatever accumulated in the buffer; nothing is
    /// substituted at finalize time. Idempotent: a second call is a no-op.
    pub fn finalize_last_ai(&mut self, references: Vec<Reference>) {
        match self.streaming_ai_mut() {
            Some(message) => {
                message.is_streaming = false;
                message.references = references;
            }
            None => tracing::debug!("finalize_last_ai with no AI message streaming"),
        }
    }

    /// True while an AI message is open and has received no answer text yet.
    pub fn last_ai_is_empty(&self) -> bool {
        self.streaming_ai().is_some_and(|m| m.content.is_empty())
    }

    pub fn is_ai_streaming(&self) -> bool {
        self.streaming_ai().is_some()
    }

    /// Replace the whole conversation with hydrated history. Annotations and
    /// sentiments belong to the old message indexes and are reset.
    pub fn replace_all(&mut self, mut history: Vec<Message>) {
        for message in &mut history {
            message.is_streaming = false;
        }
        self.messages = history;
        self.annotations.clear();
        self.sentiments.clear();
    }

    /// Record entity spans for a message. Annotations may land well after the
    /// message finalized; only an index that no longer exists is dropped.
    pub fn set_annotation(&mut self, index: usize, spans: Vec<TagSpan>) {
        if index < self.messages.len() {
            self.annotations.insert(index, spans);
        } else {
            tracing::debug!(index, "dropping annotation for unknown message index");
        }
    }

    pub fn set_sentiment(&mut self, index: usize, label: String) {
        if index < self.messages.len() {
            self.sentiments.insert(index, label);
        } else {
            tracing::debug!(index, "dropping sentiment for unknown message index");
        }
    }

    fn streaming_ai(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Ai && m.is_streaming)
    }

    fn streaming_ai_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.sender == Sender::Ai && m.is_streaming)
    }
}
