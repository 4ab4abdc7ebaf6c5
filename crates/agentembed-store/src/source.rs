//! Async seams between the embed server and persistence.
//!
//! The web crate only talks to storage through [`AgentSource`] and
//! [`ConversationLog`], so handlers can be exercised against in-process
//! fakes (including ones that fail on purpose).

use async_trait::async_trait;

use crate::agents::{Agent, AgentProfile, AgentStore, ContextFragment};
use crate::conversations::{Conversation, ConversationStore, StoredMessage};
use crate::error::StoreResult;

/// Read access to agents and their context.
#[async_trait]
pub trait AgentSource: Send + Sync {
    /// Render-time projection of an agent.
    async fn agent_profile(&self, id: &str) -> StoreResult<Option<AgentProfile>>;

    /// Full agent record.
    async fn agent(&self, id: &str) -> StoreResult<Option<Agent>>;

    /// Context fragments in storage order. Always a fresh read.
    async fn context_fragments(&self, agent_id: &str) -> StoreResult<Vec<ContextFragment>>;

    /// Count one view of the agent's embed.
    async fn record_view(&self, id: &str) -> StoreResult<()>;
}

/// Session-bound conversation persistence.
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn conversation(&self, id: &str) -> StoreResult<Option<Conversation>>;

    async fn find_guest(&self, agent_id: &str, session_id: &str)
    -> StoreResult<Option<Conversation>>;

    async fn create_guest(&self, agent_id: &str, session_id: &str) -> StoreResult<Conversation>;

    /// Bound guest conversation for the pair, created on first use.
    async fn find_or_create_guest(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> StoreResult<Conversation> {
        match self.find_guest(agent_id, session_id).await? {
            Some(conversation) => Ok(conversation),
            None => self.create_guest(agent_id, session_id).await,
        }
    }

    async fn append_turn(
        &self,
        conversation_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> StoreResult<()>;

    async fn transcript(&self, conversation_id: &str) -> StoreResult<Vec<StoredMessage>>;
}

#[async_trait]
impl AgentSource for AgentStore {
    async fn agent_profile(&self, id: &str) -> StoreResult<Option<AgentProfile>> {
        self.get_profile(id).await
    }

    async fn agent(&self, id: &str) -> StoreResult<Option<Agent>> {
        self.get(id).await
    }

    async fn context_fragments(&self, agent_id: &str) -> StoreResult<Vec<ContextFragment>> {
        AgentStore::context_fragments(self, agent_id).await
    }

    async fn record_view(&self, id: &str) -> StoreResult<()> {
        self.increment_views(id).await
    }
}

#[async_trait]
impl ConversationLog for ConversationStore {
    async fn conversation(&self, id: &str) -> StoreResult<Option<Conversation>> {
        self.get(id).await
    }

    async fn find_guest(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> StoreResult<Option<Conversation>> {
        ConversationStore::find_guest(self, agent_id, session_id).await
    }

    async fn create_guest(&self, agent_id: &str, session_id: &str) -> StoreResult<Conversation> {
        ConversationStore::create_guest(self, agent_id, session_id).await
    }

    async fn find_or_create_guest(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> StoreResult<Conversation> {
        ConversationStore::find_or_create_guest(self, agent_id, session_id).await
    }

    async fn append_turn(
        &self,
        conversation_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> StoreResult<()> {
        ConversationStore::append_turn(self, conversation_id, user_text, assistant_text).await
    }

    async fn transcript(&self, conversation_id: &str) -> StoreResult<Vec<StoredMessage>> {
        self.messages(conversation_id).await
    }
}
