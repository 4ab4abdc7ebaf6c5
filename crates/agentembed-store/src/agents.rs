//! Agent records and their context fragments.
//!
//! Agents are read-only from the embed server's point of view; the
//! management operations here (`create`, `set_public`, `add_context`) back
//! the CLI.

use std::fmt;

use chrono::Utc;
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// Persona tag that selects the synthesized system prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Personality {
    Expert,
    Friendly,
    Concise,
    Empathetic,
    /// Any other tag; falls back to the neutral template.
    Other(String),
}

impl Personality {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Expert => "expert",
            Self::Friendly => "friendly",
            Self::Concise => "concise",
            Self::Empathetic => "empathetic",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for Personality {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "expert" => Self::Expert,
            "friendly" => Self::Friendly,
            "concise" => Self::Concise,
            "empathetic" => Self::Empathetic,
            _ => Self::Other(tag.to_owned()),
        }
    }
}

impl From<String> for Personality {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<Personality> for String {
    fn from(p: Personality) -> Self {
        p.as_str().to_owned()
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of an agent needed to render its embed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub avatar_style: String,
    pub is_public: bool,
    pub slug: Option<String>,
    pub objective: String,
}

/// A full agent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub avatar_style: String,
    pub is_public: bool,
    pub slug: Option<String>,
    pub objective: String,
    /// Explicit prompt; when absent one is synthesized from the persona.
    pub system_prompt: Option<String>,
    pub personality: Personality,
    /// Monetization flags. Carried for completeness, never consulted.
    pub is_paid: bool,
    pub price_cents: Option<i64>,
    pub views: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Agent {
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar_style: self.avatar_style.clone(),
            is_public: self.is_public,
            slug: self.slug.clone(),
            objective: self.objective.clone(),
        }
    }
}

/// Input for [`AgentStore::create`].
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub objective: String,
    pub personality: Personality,
    pub system_prompt: Option<String>,
    pub avatar_style: String,
    pub slug: Option<String>,
    pub is_public: bool,
}

impl NewAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objective: String::new(),
            personality: Personality::Friendly,
            system_prompt: None,
            avatar_style: "bottts".to_owned(),
            slug: None,
            is_public: false,
        }
    }
}

/// Body of a context fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum ContextContent {
    /// Inline knowledge folded into the prompt verbatim.
    Text(String),
    /// External reference; only attributed, never fetched.
    Url(String),
}

impl ContextContent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Url(_) => "url",
        }
    }

    fn body(&self) -> &str {
        match self {
            Self::Text(s) | Self::Url(s) => s,
        }
    }
}

/// Supplementary knowledge attached to an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFragment {
    pub id: i64,
    pub agent_id: String,
    pub content: ContextContent,
}

// ═══════════════════════════════════════════════════════════════════════
//  AgentStore
// ═══════════════════════════════════════════════════════════════════════

const AGENT_COLUMNS: &str = "id, name, avatar_style, is_public, slug, objective, system_prompt, \
                             personality, is_paid, price_cents, views, created_at, updated_at";

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let personality: String = row.get(7)?;
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        avatar_style: row.get(2)?,
        is_public: row.get(3)?,
        slug: row.get(4)?,
        objective: row.get(5)?,
        system_prompt: row.get(6)?,
        personality: Personality::from(personality),
        is_paid: row.get(8)?,
        price_cents: row.get(9)?,
        views: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// SQLite-backed agent and context-fragment storage.
#[derive(Clone)]
pub struct AgentStore {
    db: Database,
}

impl AgentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a new agent with a fresh UUID v7 identifier.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, new: NewAgent) -> StoreResult<Agent> {
        if new.name.trim().is_empty() {
            return Err(StoreError::InvalidArgument("agent name must not be empty".into()));
        }

        let now = Utc::now().timestamp();
        let agent = Agent {
            id: Uuid::now_v7().to_string(),
            name: new.name,
            avatar_style: new.avatar_style,
            is_public: new.is_public,
            slug: new.slug,
            objective: new.objective,
            system_prompt: new.system_prompt,
            personality: new.personality,
            is_paid: false,
            price_cents: None,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        let row = agent.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO agents (id, name, avatar_style, is_public, slug, objective, \
                     system_prompt, personality, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    rusqlite::params![
                        row.id,
                        row.name,
                        row.avatar_style,
                        row.is_public,
                        row.slug,
                        row.objective,
                        row.system_prompt,
                        row.personality.as_str(),
                        row.created_at,
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(agent_id = %agent.id, "agent created");
        Ok(agent)
    }

    /// Fetch a full agent record.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<Agent>> {
        let id = id.to_owned();
        self.db
            .execute(move |conn| {
                let agent = conn
                    .query_row(
                        &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                        rusqlite::params![id],
                        agent_from_row,
                    )
                    .optional()?;
                Ok(agent)
            })
            .await
    }

    /// Fetch only the columns the embed document needs.
    #[instrument(skip(self))]
    pub async fn get_profile(&self, id: &str) -> StoreResult<Option<AgentProfile>> {
        let id = id.to_owned();
        self.db
            .execute(move |conn| {
                let profile = conn
                    .query_row(
                        "SELECT id, name, avatar_style, is_public, slug, objective \
                         FROM agents WHERE id = ?1",
                        rusqlite::params![id],
                        |row| {
                            Ok(AgentProfile {
                                id: row.get(0)?,
                                name: row.get(1)?,
                                avatar_style: row.get(2)?,
                                is_public: row.get(3)?,
                                slug: row.get(4)?,
                                objective: row.get(5)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(profile)
            })
            .await
    }

    /// All agents, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> StoreResult<Vec<Agent>> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt
                    .query_map([], agent_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Flip the visibility flag.
    #[instrument(skip(self))]
    pub async fn set_public(&self, id: &str, is_public: bool) -> StoreResult<()> {
        let id = id.to_owned();
        let now = Utc::now().timestamp();
        self.db
            .execute(move |conn| {
                let updated = conn.execute(
                    "UPDATE agents SET is_public = ?2, updated_at = ?3 WHERE id = ?1",
                    rusqlite::params![id, is_public, now],
                )?;
                if updated == 0 {
                    return Err(StoreError::NotFound { entity: "agent", id });
                }
                Ok(())
            })
            .await
    }

    /// Bump the agent's view counter.
    #[instrument(skip(self))]
    pub async fn increment_views(&self, id: &str) -> StoreResult<()> {
        let id = id.to_owned();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "UPDATE agents SET views = views + 1 WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(())
            })
            .await
    }

    /// Attach a context fragment to an agent.
    #[instrument(skip(self, content))]
    pub async fn add_context(
        &self,
        agent_id: &str,
        content: ContextContent,
    ) -> StoreResult<ContextFragment> {
        if content.body().trim().is_empty() {
            return Err(StoreError::InvalidArgument("context content must not be empty".into()));
        }

        let agent_id = agent_id.to_owned();
        let now = Utc::now().timestamp();
        self.db
            .execute(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO agent_contexts (agent_id, kind, content, created_at) \
                     SELECT ?1, ?2, ?3, ?4 WHERE EXISTS (SELECT 1 FROM agents WHERE id = ?1)",
                    rusqlite::params![agent_id, content.kind(), content.body(), now],
                )?;
                if inserted == 0 {
                    return Err(StoreError::NotFound {
                        entity: "agent",
                        id: agent_id,
                    });
                }
                Ok(ContextFragment {
                    id: conn.last_insert_rowid(),
                    agent_id,
                    content,
                })
            })
            .await
    }

    /// Context fragments for `agent_id` in storage order.
    #[instrument(skip(self))]
    pub async fn context_fragments(&self, agent_id: &str) -> StoreResult<Vec<ContextFragment>> {
        let agent_id = agent_id.to_owned();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, agent_id, kind, content FROM agent_contexts \
                     WHERE agent_id = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![agent_id], |row| {
                        let kind: String = row.get(2)?;
                        let body: String = row.get(3)?;
                        let content = match kind.as_str() {
                            "url" => ContextContent::Url(body),
                            _ => ContextContent::Text(body),
                        };
                        Ok(ContextFragment {
                            id: row.get(0)?,
                            agent_id: row.get(1)?,
                            content,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
