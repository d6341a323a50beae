//! HTTP API for the tutoring service
//!
//! Course browsing plus one live session per user, observable over SSE.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::db::Database;
use crate::runtime::SessionManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(db: Database, sessions: SessionManager) -> Self {
        Self {
            db,
            sessions: Arc::new(sessions),
        }
    }
}
