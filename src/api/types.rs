//! API request and response types

use crate::db::{ConversationPairEntry, Course, SavedContent, SavedContentEntry};
use serde::{Deserialize, Serialize};

/// Request to create a course
#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Request to replace a course's title and content
#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: String,
    pub content: String,
}

/// Request to bind a user's session to a course
#[derive(Debug, Deserialize)]
pub struct SelectCourseRequest {
    pub course_id: String,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CourseListResponse {
    pub courses: Vec<Course>,
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub course: Course,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct SavedContentResponse {
    pub saved: SavedContent,
}

#[derive(Debug, Serialize)]
pub struct SavedContentListResponse {
    pub saved: Vec<SavedContentEntry>,
}

/// Stored conversation pairs for the history review
#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub pairs: Vec<ConversationPairEntry>,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub ok: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
