//! Session core for chatting with a sift deployment.
//!
//! The pieces fit together the same way on every surface: a
//! [`ChatSession`](controller::ChatSession) owns the conversation and the
//! single in-flight stream, a UI submits queries and pumps
//! [`update`](controller::ChatSession::update) on its tick, and everything
//! the UI renders is read back out of the [`Conversation`](store::Conversation).

pub mod annotate;
pub mod backend;
pub mod constraints;
pub mod controller;
pub mod demux;
pub mod message;
pub mod store;

pub use annotate::{NO_ENTITY_TAG, merge_tag_spans, resolve_sentiment};
pub use backend::{ChatBackend, ChunkStream};
pub use constraints::MetadataCatalog;
pub use controller::{ChatSession, SessionConfig, SessionEvent};
pub use demux::{CONTEXT_SENTINEL, DemuxEvent, StreamDemux};
pub use message::{Message, Sender, TagSpan};
pub use sift_client::{ContextPayload, Reference};
pub use store::Conversation;
