use chrono::Local;
use serde::Serialize;
use sift_client::{HistoryMessage, HistorySender, Reference};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Sender {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "AI")]
    Ai,
}

/// One turn of the conversation. AI messages are mutable while their stream
/// is live (`is_streaming`), immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub references: Vec<Reference>,
    pub timestamp: String,
    pub is_streaming: bool,
}

impl Message {
    pub fn human(content: &str) -> Self {
        Self {
            sender: Sender::Human,
            content: content.to_string(),
            references: Vec::new(),
            timestamp: timestamp_now(),
            is_streaming: false,
        }
    }

    pub fn ai_streaming() -> Self {
        Self {
            sender: Sender::Ai,
            content: String::new(),
            references: Vec::new(),
            timestamp: timestamp_now(),
            is_streaming: true,
        }
    }

    /// Rebuild a message from a hydrated history turn. Unknown senders are
    /// dropped rather than failing the whole hydration.
    pub fn from_history(history: HistoryMessage) -> Option<Self> {
        let sender = match history.sender {
            HistorySender::Human => Sender::Human,
            HistorySender::Ai => Sender::Ai,
            HistorySender::Unknown => {
                tracing::warn!("dropping history message with unknown sender");
                return None;
            }
        };
        Some(Self {
            sender,
            content: history.content,
            references: history.references,
            timestamp: timestamp_now(),
            is_streaming: false,
        })
    }
}

/// Annotated slice of a message, produced by the token classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagSpan {
    pub text: String,
    pub tag: String,
}

fn timestamp_now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
