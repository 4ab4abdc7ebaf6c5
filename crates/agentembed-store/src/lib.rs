//! # agentembed-store
//!
//! Storage engine for the agent embed server.
//!
//! Provides SQLite-backed persistence for agents, their context fragments
//! and session-bound guest conversations, plus the lazily-expiring
//! [`TtlCache`] the server keeps in front of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  TtlCache (DashMap + Clock, lazy TTL)    │
//! ├─────────────────────────────────────────┤
//! │  AgentSource / ConversationLog (traits)  │
//! │  AgentStore  ConversationStore           │
//! ├─────────────────────────────────────────┤
//! │  Database (rusqlite WAL)                 │
//! │  Migrations (versioned, transactional)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use agentembed_store::{AgentStore, Database, NewAgent};
//!
//! let db = Database::open_and_migrate("data/agentembed.db").await?;
//! let agents = AgentStore::new(db.clone());
//! let helper = agents.create(NewAgent::new("Helper")).await?;
//! ```

pub mod agents;
pub mod cache;
pub mod clock;
pub mod conversations;
pub mod db;
pub mod error;
pub mod migration;
pub mod source;

// ── re-exports ───────────────────────────────────────────────────────

pub use agents::{
    Agent, AgentProfile, AgentStore, ContextContent, ContextFragment, NewAgent, Personality,
};
pub use cache::{CacheStats, DEFAULT_TTL, TtlCache, TtlCacheBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use conversations::{Conversation, ConversationStore, MessageRole, StoredMessage};
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use source::{AgentSource, ConversationLog};
