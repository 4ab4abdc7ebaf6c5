//! Wire-level types for chat completions.
//!
//! These are provider-agnostic; [`super::client`] translates them into the
//! OpenAI-compatible request body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output budget for a single chat turn.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Sampling temperature for a single chat turn.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that shape model behavior.
    System,
    User,
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A full request to send to the completion API. Always non-streaming.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier; empty means the client's default model.
    pub model: String,

    pub messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// A request with the fixed chat-turn budget (2000 tokens, temperature 0.7).
    pub fn chat_turn(messages: Vec<Message>) -> Self {
        Self {
            model: String::new(),
            messages,
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
        }
    }
}

/// The assistant's reply plus whatever usage accounting the provider sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    /// Raw provider usage object (`{}` when the provider omits it).
    pub usage: Value,
}
