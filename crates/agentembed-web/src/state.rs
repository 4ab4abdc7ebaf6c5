//! Shared application state for the embed server.
//!
//! [`AppState`] is wrapped in an `Arc` and handed to every handler. Storage
//! and the completion backend sit behind trait objects so tests can swap in
//! fakes.

use std::sync::Arc;

use agentembed_agent::CompletionBackend;
use agentembed_store::{AgentSource, ConversationLog};

use crate::WebConfig;
use crate::cache::EmbedCaches;

#[derive(Clone)]
pub struct AppState {
    /// Agent records and context fragments.
    pub agents: Arc<dyn AgentSource>,

    /// Guest conversation persistence.
    pub conversations: Arc<dyn ConversationLog>,

    /// `None` when no upstream API key is configured; chat then fails with
    /// a configuration error while the document route keeps working.
    pub llm: Option<Arc<dyn CompletionBackend>>,

    pub caches: EmbedCaches,

    pub config: WebConfig,
}
