//! JSON bodies exchanged with the generated client.

use agentembed_agent::Message;
use agentembed_store::{MessageRole, StoredMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior exchange supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn to_message(&self) -> Message {
        match self.role {
            TurnRole::User => Message::user(self.content.clone()),
            TurnRole::Assistant => Message::assistant(self.content.clone()),
        }
    }
}

impl From<StoredMessage> for ConversationTurn {
    fn from(msg: StoredMessage) -> Self {
        let role = match msg.role {
            MessageRole::User => TurnRole::User,
            MessageRole::Assistant => TurnRole::Assistant,
        };
        Self {
            role,
            content: msg.content,
        }
    }
}

/// `POST /embed` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub agent_id: Option<String>,
    pub message: Option<String>,
    pub conversation: Option<Vec<ConversationTurn>>,
    pub conversation_id: Option<String>,
    pub session_id: Option<String>,
    pub embedded: Option<bool>,
}

/// Successful chat response, also the value held in the reply cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    pub usage: Value,
    pub conversation_id: Option<String>,
}

/// Trimmed, non-empty text or `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
