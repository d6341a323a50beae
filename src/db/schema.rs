//! Database schema and record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS courses (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_courses_created ON courses(created_at DESC);

CREATE TABLE IF NOT EXISTS chat_history (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    message TEXT NOT NULL,
    response TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    created_at TEXT NOT NULL,

    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chat_history_user_course
    ON chat_history(user_id, course_id, created_at);

CREATE TABLE IF NOT EXISTS saved_content (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    course_id TEXT NOT NULL,
    content TEXT NOT NULL,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_saved_content_user ON saved_content(user_id, created_at DESC);
";

/// Course record; `content` is the knowledge base injected into every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One durably stored user message and its assistant response
///
/// Written only once both halves exist; never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPair {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub message: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// An assistant reply the user chose to keep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedContent {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub content: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Saved content joined with its course title, for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedContentEntry {
    #[serde(flatten)]
    pub saved: SavedContent,
    pub course_title: Option<String>,
}

/// A stored pair joined with its course title, for the history review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationPairEntry {
    #[serde(flatten)]
    pub pair: ConversationPair,
    pub course_title: Option<String>,
}
