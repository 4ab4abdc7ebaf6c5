//! LLM client and wire types.

pub mod client;
pub mod types;

pub use client::{
    CEREBRAS_BASE_URL, CEREBRAS_DEFAULT_MODEL, CompletionBackend, DEFAULT_TIMEOUT, LlmClient,
    LlmClientConfig,
};
pub use types::{ChatRequest, Completion, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, Message, Role};
