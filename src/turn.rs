//! Turns: the in-memory unit of a live conversation

use crate::db::ConversationPair;
use crate::llm::{ChatMessage, ChatRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<TurnRole> for ChatRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => ChatRole::User,
            TurnRole::Assistant => ChatRole::Assistant,
        }
    }
}

/// One message in the live conversation; never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(id: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role: TurnRole::User,
            content: content.into(),
            timestamp: at,
        }
    }

    pub fn assistant(
        id: impl Into<String>,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: at,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == TurnRole::Assistant
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role.into(), self.content.clone())
    }
}

/// Expand a stored pair into its two turns: the user message, then the reply
///
/// Both turns carry the pair's timestamp. Ids are derived from the pair id
/// so the expansion is deterministic.
pub fn expand_pair(pair: &ConversationPair) -> [Turn; 2] {
    [
        Turn::user(
            format!("{}-user", pair.id),
            pair.message.clone(),
            pair.created_at,
        ),
        Turn::assistant(
            format!("{}-assistant", pair.id),
            pair.response.clone(),
            pair.created_at,
        ),
    ]
}
