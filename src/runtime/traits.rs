//! Trait abstractions for runtime I/O
//!
//! The executor and promote path only see these traits, so tests can swap
//! in the in-memory doubles from `testing`.

use crate::db::{ConversationPair, Database, SavedContent};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable store of finished exchanges
#[async_trait]
pub trait PairStore: Send + Sync {
    /// Record one user message together with its reply
    async fn save_pair(
        &self,
        user_id: &str,
        course_id: &str,
        message: &str,
        response: &str,
    ) -> Result<ConversationPair, String>;

    /// Pairs for one (user, course), oldest first
    async fn list_pairs(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<ConversationPair>, String>;
}

/// Durable store of promoted replies
#[async_trait]
pub trait SavedContentStore: Send + Sync {
    async fn save_content(
        &self,
        user_id: &str,
        course_id: &str,
        content: &str,
        title: &str,
    ) -> Result<SavedContent, String>;
}

/// Combined storage trait for convenience
pub trait Storage: PairStore + SavedContentStore {}
impl<T: PairStore + SavedContentStore> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: PairStore + ?Sized> PairStore for Arc<T> {
    async fn save_pair(
        &self,
        user_id: &str,
        course_id: &str,
        message: &str,
        response: &str,
    ) -> Result<ConversationPair, String> {
        (**self).save_pair(user_id, course_id, message, response).await
    }

    async fn list_pairs(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<ConversationPair>, String> {
        (**self).list_pairs(user_id, course_id).await
    }
}

#[async_trait]
impl<T: SavedContentStore + ?Sized> SavedContentStore for Arc<T> {
    async fn save_content(
        &self,
        user_id: &str,
        course_id: &str,
        content: &str,
        title: &str,
    ) -> Result<SavedContent, String> {
        (**self).save_content(user_id, course_id, content, title).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PairStore for DatabaseStorage {
    async fn save_pair(
        &self,
        user_id: &str,
        course_id: &str,
        message: &str,
        response: &str,
    ) -> Result<ConversationPair, String> {
        self.db
            .insert_pair(user_id, course_id, message, response)
            .map_err(|e| e.to_string())
    }

    async fn list_pairs(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<ConversationPair>, String> {
        self.db
            .list_pairs(user_id, course_id)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl SavedContentStore for DatabaseStorage {
    async fn save_content(
        &self,
        user_id: &str,
        course_id: &str,
        content: &str,
        title: &str,
    ) -> Result<SavedContent, String> {
        self.db
            .insert_saved_content(user_id, course_id, content, title)
            .map_err(|e| e.to_string())
    }
}
