//! Guest conversations bound to an embed session.
//!
//! A conversation is created lazily on the first persisted turn of an
//! (agent, session) pair and is append-only afterwards: every successful
//! chat turn adds exactly one user and one assistant message.

use std::fmt;

use chrono::Utc;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A persisted exchange between one session and one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub agent_id: String,
    pub session_id: String,
    pub is_guest: bool,
    pub created_at: i64,
}

/// Author of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored turn half.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: i64,
}

// ═══════════════════════════════════════════════════════════════════════
//  ConversationStore
// ═══════════════════════════════════════════════════════════════════════

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        session_id: row.get(2)?,
        is_guest: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// SQLite-backed conversation and message storage.
#[derive(Clone)]
pub struct ConversationStore {
    db: Database,
}

impl ConversationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Look up a conversation by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<Conversation>> {
        let id = id.to_owned();
        self.db
            .execute(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT id, agent_id, session_id, is_guest, created_at \
                         FROM conversations WHERE id = ?1",
                        rusqlite::params![id],
                        conversation_from_row,
                    )
                    .optional()?;
                Ok(found)
            })
            .await
    }

    /// The guest conversation bound to (agent, session), if any.
    #[instrument(skip(self))]
    pub async fn find_guest(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> StoreResult<Option<Conversation>> {
        let agent_id = agent_id.to_owned();
        let session_id = session_id.to_owned();
        self.db
            .execute(move |conn| {
                let found = conn
                    .query_row(
                        "SELECT id, agent_id, session_id, is_guest, created_at \
                         FROM conversations \
                         WHERE agent_id = ?1 AND session_id = ?2 AND is_guest = 1",
                        rusqlite::params![agent_id, session_id],
                        conversation_from_row,
                    )
                    .optional()?;
                Ok(found)
            })
            .await
    }

    /// Create the guest conversation for (agent, session).
    ///
    /// If a concurrent request created it first, the existing row is
    /// returned instead, so a session never ends up with two conversations.
    #[instrument(skip(self))]
    pub async fn create_guest(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> StoreResult<Conversation> {
        if session_id.trim().is_empty() {
            return Err(StoreError::InvalidArgument("session id must not be empty".into()));
        }

        let id = Uuid::now_v7().to_string();
        let agent_id = agent_id.to_owned();
        let session_id = session_id.to_owned();
        let now = Utc::now().timestamp();

        let conversation = self
            .db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO conversations (id, agent_id, session_id, is_guest, created_at) \
                     VALUES (?1, ?2, ?3, 1, ?4) \
                     ON CONFLICT(agent_id, session_id, is_guest) DO NOTHING",
                    rusqlite::params![id, agent_id, session_id, now],
                )?;
                let conversation = conn.query_row(
                    "SELECT id, agent_id, session_id, is_guest, created_at \
                     FROM conversations \
                     WHERE agent_id = ?1 AND session_id = ?2 AND is_guest = 1",
                    rusqlite::params![agent_id, session_id],
                    conversation_from_row,
                )?;
                Ok(conversation)
            })
            .await?;

        debug!(conversation_id = %conversation.id, "guest conversation ready");
        Ok(conversation)
    }

    /// Find the bound conversation or create it.
    pub async fn find_or_create_guest(
        &self,
        agent_id: &str,
        session_id: &str,
    ) -> StoreResult<Conversation> {
        match self.find_guest(agent_id, session_id).await? {
            Some(conversation) => Ok(conversation),
            None => self.create_guest(agent_id, session_id).await,
        }
    }

    /// Append one user message followed by one assistant message.
    ///
    /// Both rows are written in a single transaction so a turn is never
    /// half-persisted.
    #[instrument(skip(self, user_text, assistant_text))]
    pub async fn append_turn(
        &self,
        conversation_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> StoreResult<()> {
        let conversation_id = conversation_id.to_owned();
        let user_text = user_text.to_owned();
        let assistant_text = assistant_text.to_owned();
        let now = Utc::now().timestamp();

        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                for (role, content) in [
                    (MessageRole::User, &user_text),
                    (MessageRole::Assistant, &assistant_text),
                ] {
                    tx.execute(
                        "INSERT INTO messages (conversation_id, role, content, created_at) \
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![conversation_id, role.as_str(), content, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    /// Messages of a conversation in insertion order.
    #[instrument(skip(self))]
    pub async fn messages(&self, conversation_id: &str) -> StoreResult<Vec<StoredMessage>> {
        let conversation_id = conversation_id.to_owned();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, conversation_id, role, content, created_at FROM messages \
                     WHERE conversation_id = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![conversation_id], |row| {
                        let role: String = row.get(2)?;
                        Ok(StoredMessage {
                            id: row.get(0)?,
                            conversation_id: row.get(1)?,
                            role: if role == "assistant" {
                                MessageRole::Assistant
                            } else {
                                MessageRole::User
                            },
                            content: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Number of conversations bound to an agent.
    pub async fn count_for_agent(&self, agent_id: &str) -> StoreResult<i64> {
        let agent_id = agent_id.to_owned();
        self.db
            .execute(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM conversations WHERE agent_id = ?1",
                    rusqlite::params![agent_id],
                    |row| row.get(0),
                )?)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
