//! Events that drive a session

use super::SessionKey;
use crate::db::Course;
use crate::turn::Turn;
use chrono::{DateTime, Utc};

/// Events that trigger session transitions
///
/// Ids and timestamps for new turns are minted by the runtime before the
/// event is dispatched.
#[derive(Debug, Clone)]
pub enum Event {
    // Host events
    SelectCourse {
        course: Course,
    },
    UserInput {
        text: String,
        turn_id: String,
        at: DateTime<Utc>,
    },

    // Background results, stamped with the issuing session's key
    HistoryLoaded {
        key: SessionKey,
        turns: Vec<Turn>,
    },
    CompletionSucceeded {
        key: SessionKey,
        request_id: u64,
        reply: String,
        turn_id: String,
        at: DateTime<Utc>,
    },
    CompletionFailed {
        key: SessionKey,
        request_id: u64,
        error: String,
        turn_id: String,
        at: DateTime<Utc>,
    },
}
