//! Effects produced by session transitions

use super::SessionKey;
use crate::llm::ChatMessage;

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Reconstruct the turn list for the key's (user, course)
    LoadHistory { key: SessionKey },

    /// Issue a completion request (spawns as background task)
    RequestCompletion {
        key: SessionKey,
        request_id: u64,
        messages: Vec<ChatMessage>,
    },

    /// Durably record a finished exchange; fire-and-forget
    PersistPair {
        user_id: String,
        course_id: String,
        message: String,
        response: String,
    },

    /// Push the current snapshot to subscribers
    Publish,
}
