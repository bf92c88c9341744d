use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use sift_client::Reference;
use tokio::sync::mpsc;

use crate::annotate;
use crate::backend::ChatBackend;
use crate::constraints::MetadataCatalog;
use crate::demux::{DemuxEvent, StreamDemux};
use crate::message::{Message, TagSpan};
use crate::store::Conversation;

/// Shown in place of an answer when the stream failed before producing any
/// text. A turn that already streamed partial text keeps that text instead.
pub const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while generating this answer. Please try again.";

/// Updates posted by the transport and annotation tasks, drained by
/// [`ChatSession::update`] on the UI tick.
#[derive(Debug)]
pub enum SessionEvent {
    Chunk { turn: u64, text: String },
    Completed { turn: u64 },
    Interrupted { turn: u64 },
    Error { turn: u64, message: String },
    Annotation { index: usize, spans: Vec<TagSpan> },
    Sentiment { index: usize, label: String },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub provider: String,
    /// `top_k` forwarded to the classification endpoints.
    pub top_k: usize,
    /// Whether a token classification deployment exists to annotate with.
    pub token_classifier: bool,
    /// Whether a sentiment deployment exists to classify human messages.
    pub sentiment_classifier: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            top_k: 1,
            token_classifier: false,
            sentiment_classifier: false,
        }
    }
}

/// State of the one in-flight chat request. Created per submitted query,
/// dropped on completion, error, or cancellation.
struct StreamSession {
    turn: u64,
    ai_index: usize,
    demux: StreamDemux,
    references: Option<Vec<Reference>>,
    interrupt_tx: mpsc::Sender<()>,
}

/// Owns the conversation, the persisted search constraints, and the single
/// active stream. UIs call [`submit`](Self::submit) / [`cancel`](Self::cancel)
/// and pump [`update`](Self::update) once per tick; everything they render is
/// read back from [`conversation`](Self::conversation).
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    config: SessionConfig,
    conversation: Conversation,
    catalog: MetadataCatalog,
    constraints: HashMap<String, String>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    active: Option<StreamSession>,
    turn_counter: u64,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, config: SessionConfig) -> Self {
        Self::with_catalog(backend, config, MetadataCatalog::default())
    }

    pub fn with_catalog(
        backend: Arc<dyn ChatBackend>,
        config: SessionConfig,
        catalog: MetadataCatalog,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1024);
        Self {
            backend,
            config,
            conversation: Conversation::new(),
            catalog,
            constraints: HashMap::new(),
            events_tx,
            events_rx,
            active: None,
            turn_counter: 0,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn constraints(&self) -> &HashMap<String, String> {
        &self.constraints
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Select the provider on the backend and replace the conversation with
    /// its server-held history. Called once per provider switch.
    pub async fn hydrate(&mut self) -> anyhow::Result<()> {
        self.backend.set_chat(&self.config.provider).await?;
        let history = self.backend.chat_history(&self.config.provider).await?;
        self.cancel();
        let messages = history.into_iter().filter_map(Message::from_history).collect();
        self.conversation.replace_all(messages);
        Ok(())
    }

    /// Open a new turn. A blank query is ignored; an in-flight stream is cut
    /// and finalized first, so at most one stream is ever live.
    pub fn submit(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        if self.active.is_some() {
            self.cancel();
        }

        let human_index = self.conversation.push_human(query);
        if self.config.sentiment_classifier {
            annotate::spawn_sentiment_classification(
                Arc::clone(&self.backend),
                self.events_tx.clone(),
                human_index,
                query.to_string(),
                self.config.top_k,
            );
        }
        if self.config.token_classifier {
            annotate::spawn_token_annotation(
                Arc::clone(&self.backend),
                self.events_tx.clone(),
                human_index,
                query.to_string(),
                self.config.top_k,
            );
        }

        let derived = self.catalog.constraints_for(query);
        if !derived.is_empty() {
            self.constraints = derived;
        }

        let Some(ai_index) = self.conversation.begin_ai_turn() else {
            return;
        };

        self.turn_counter += 1;
        let turn = self.turn_counter;
        let (interrupt_tx, mut interrupt_rx) = mpsc::channel(1);

        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        let provider = self.config.provider.clone();
        let constraints = self.constraints.clone();
        let query = query.to_string();

        tokio::spawn(async move {
            let mut stream = match backend.stream_chat(&query, &provider, &constraints).await {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = events
                        .send(SessionEvent::Error { turn, message: err.to_string() })
                        .await;
                    return;
                }
            };

            loop {
                tokio::select! {
                    chunk = stream.next() => match chunk {
                        Some(Ok(text)) => {
                            let _ = events.send(SessionEvent::Chunk { turn, text }).await;
                        }
                        Some(Err(err)) => {
                            let _ = events
                                .send(SessionEvent::Error { turn, message: err.to_string() })
                                .await;
                            return;
                        }
                        None => {
                            let _ = events.send(SessionEvent::Completed { turn }).await;
                            return;
                        }
                    },
                    _ = interrupt_rx.recv() => {
                        // Dropping the stream aborts the underlying request.
                        let _ = events.send(SessionEvent::Interrupted { turn }).await;
                        return;
                    }
                }
            }
        });

        self.active = Some(StreamSession {
            turn,
            ai_index,
            demux: StreamDemux::default(),
            references: None,
            interrupt_tx,
        });
    }

    /// Cut the in-flight stream. Answer text received so far is kept and the
    /// AI message is finalized with it.
    pub fn cancel(&mut self) {
        let Some(mut session) = self.active.take() else {
            return;
        };
        let _ = session.interrupt_tx.try_send(());
        session.demux.finish();
        let references = session.references.take().unwrap_or_default();
        self.conversation.finalize_last_ai(references);
    }

    /// Drain pending events into the conversation. Non-blocking; call once
    /// per UI tick.
    pub fn update(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Chunk { turn, text } => {
                let Some(session) = self.active.as_mut().filter(|s| s.turn == turn) else {
                    tracing::debug!(turn, "dropping chunk from a stale stream");
                    return;
                };
                match session.demux.push(&text) {
                    Some(DemuxEvent::Answer(delta)) => self.conversation.append_to_last_ai(&delta),
                    Some(DemuxEvent::Context(payload)) => {
                        tracing::debug!(
                            ai_index = session.ai_index,
                            references = payload.references.len(),
                            "context payload committed"
                        );
                        session.references = Some(payload.references);
                    }
                    None => {}
                }
            }
            SessionEvent::Completed { turn } => self.finish_turn(turn, None),
            SessionEvent::Interrupted { turn } => self.finish_turn(turn, None),
            SessionEvent::Error { turn, message } => self.finish_turn(turn, Some(message)),
            SessionEvent::Annotation { index, spans } => {
                self.conversation.set_annotation(index, spans)
            }
            SessionEvent::Sentiment { index, label } => {
                self.conversation.set_sentiment(index, label)
            }
        }
    }

    fn finish_turn(&mut self, turn: u64, error: Option<String>) {
        if !self.active.as_ref().is_some_and(|s| s.turn == turn) {
            tracing::debug!(turn, "dropping terminal event from a stale stream");
            return;
        }
        let Some(mut session) = self.active.take() else {
            return;
        };
        session.demux.finish();
        if let Some(message) = error {
            tracing::error!(%message, "chat stream failed");
            if self.conversation.last_ai_is_empty() {
                self.conversation.append_to_last_ai(FALLBACK_ANSWER);
            }
        }
        let references = session.references.take().unwrap_or_default();
        self.conversation.finalize_last_ai(references);
    }
}
