//! Session state types

use crate::db::Course;
use crate::turn::Turn;
use serde::Serialize;

/// Identity of the session that issued a request or history load
///
/// `token` increases on every course selection, so two keys for the same
/// user and course still differ across re-selections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionKey {
    pub user_id: String,
    pub course_id: String,
    pub token: u64,
}

/// Mode of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No course selected yet; sends are ignored
    NoCourse,

    /// Course selected, ready for input
    Idle { key: SessionKey, course: Course },

    /// One completion request outstanding
    Sending {
        key: SessionKey,
        course: Course,
        request_id: u64,
        /// The user input awaiting its reply
        input: String,
    },
}

impl SessionState {
    pub fn key(&self) -> Option<&SessionKey> {
        match self {
            SessionState::NoCourse => None,
            SessionState::Idle { key, .. } | SessionState::Sending { key, .. } => Some(key),
        }
    }

    pub fn course(&self) -> Option<&Course> {
        match self {
            SessionState::NoCourse => None,
            SessionState::Idle { course, .. } | SessionState::Sending { course, .. } => {
                Some(course)
            }
        }
    }

    pub fn is_sending(&self) -> bool {
        matches!(self, SessionState::Sending { .. })
    }
}

/// Everything a session owns: its mode, the live turns, and its counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: SessionState,
    pub turns: Vec<Turn>,
    /// Last issued session token
    pub last_token: u64,
    /// Last issued completion request id
    pub last_request_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::NoCourse,
            turns: Vec::new(),
            last_token: 0,
            last_request_id: 0,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable context a session runs with
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
