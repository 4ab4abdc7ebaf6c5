//! Upstream completion client and prompt assembly for the agent embed
//! server.
//!
//! ## Modules
//!
//! - [`llm`] -- OpenAI-compatible chat-completions client and wire types.
//! - [`prompt`] -- System prompt synthesis and message assembly.
//! - [`error`] -- Agent error types.

pub mod error;
pub mod llm;
pub mod prompt;

pub use error::{AgentError, Result};
pub use llm::{
    CEREBRAS_BASE_URL, CEREBRAS_DEFAULT_MODEL, ChatRequest, Completion, CompletionBackend,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT, LlmClient, LlmClientConfig, Message,
    Role,
};
pub use prompt::{CONTEXT_PREAMBLE, assemble_messages, build_system_prompt, persona_prompt};
