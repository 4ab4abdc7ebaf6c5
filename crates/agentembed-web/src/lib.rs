//! Embed server for agentembed.
//!
//! Serves a self-contained chat document for any public agent and answers
//! the chat turns that document posts back:
//!
//! - `GET /embed?agentId=..`: HTML/CSS/JS widget, framable from any origin.
//! - `POST /embed`: one chat turn against the upstream completion API,
//!   with reply caching and optional guest conversation persistence.
//! - `OPTIONS /embed`: CORS preflight.
//!
//! The same three methods are mounted on `/functions/v1/cerebras-chat`,
//! which is where the generated client posts to.

pub mod cache;
pub mod embed;
pub mod error;
pub mod render;
pub mod server;
pub mod state;
pub mod wire;

pub use cache::{EmbedCaches, document_cache_key, reply_cache_key};
pub use error::ApiError;
pub use server::{CHAT_PATH, EMBED_PATH, EmbedServer};
pub use state::AppState;
pub use wire::{ChatBody, ChatReply, ConversationTurn, TurnRole};

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
    /// Externally visible origin, e.g. `https://chat.example.com`. When unset
    /// the chat endpoint is derived from the request's `Host` header.
    pub public_base_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 3000,
            public_base_url: None,
        }
    }
}
