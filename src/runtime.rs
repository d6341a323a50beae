//! Runtime for live tutoring sessions
//!
//! One runtime task per user owns that user's [`Session`](crate::session::Session).
//! Hosts talk to it through a [`SessionHandle`] and observe it through
//! [`SessionSnapshot`]s published on a watch channel.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::db::{Course, SavedContent};
use crate::llm::CompletionClient;
use crate::promote::{self, PromoteError};
use crate::session::{Event, Session, SessionContext};
use crate::turn::Turn;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};

/// The selected course, as shown to hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseRef {
    pub id: String,
    pub title: String,
}

impl From<&Course> for CourseRef {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
        }
    }
}

/// Read-only view of a session: the ordered turns and the loading flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub user_id: String,
    pub course: Option<CourseRef>,
    pub turns: Vec<Turn>,
    /// True while a completion request is outstanding
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            course: None,
            turns: Vec::new(),
            loading: false,
        }
    }

    pub fn capture(context: &SessionContext, session: &Session) -> Self {
        Self {
            user_id: context.user_id.clone(),
            course: session.state.course().map(CourseRef::from),
            turns: session.turns.clone(),
            loading: session.state.is_sending(),
        }
    }

    pub fn find_turn(&self, turn_id: &str) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == turn_id)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session runtime has stopped")]
    Closed,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    saved: Arc<dyn SavedContentStore>,
}

impl SessionHandle {
    /// Switch the session to a course; the turn list is rebuilt from history
    pub async fn select_course(&self, course: Course) -> Result<(), SessionError> {
        self.dispatch(Event::SelectCourse { course }).await
    }

    /// Queue user input
    ///
    /// Input that arrives without a course, blank, or while a reply is
    /// outstanding is dropped by the session without any change.
    pub async fn send(&self, input: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Event::UserInput {
            text: input.into(),
            turn_id: uuid::Uuid::new_v4().to_string(),
            at: Utc::now(),
        })
        .await
    }

    /// Save an assistant turn of the current session
    pub async fn promote(&self, turn_id: &str) -> Result<SavedContent, PromoteError> {
        let snapshot = self.snapshot();
        promote::promote(self.saved.as_ref(), &snapshot, turn_id).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    async fn dispatch(&self, event: Event) -> Result<(), SessionError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }
}

struct SessionEntry {
    handle: SessionHandle,
    /// Milliseconds since the manager started
    last_used: AtomicU64,
}

/// Manager for all user sessions
///
/// Sessions are created on first use and live until [`evict_idle`](Self::evict_idle)
/// drops them.
pub struct SessionManager {
    storage: Arc<dyn Storage>,
    client: Arc<dyn CompletionClient>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    started: Instant,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn Storage>, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            storage,
            client,
            sessions: RwLock::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Get or create the session for a user
    pub async fn get_or_create(&self, user_id: &str) -> SessionHandle {
        if let Some(entry) = self.sessions.read().await.get(user_id) {
            entry.last_used.store(self.elapsed_ms(), Ordering::Relaxed);
            return entry.handle.clone();
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have raced us between the two locks
        if let Some(entry) = sessions.get(user_id) {
            entry.last_used.store(self.elapsed_ms(), Ordering::Relaxed);
            return entry.handle.clone();
        }

        let (event_tx, event_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::empty(user_id));

        let runtime = SessionRuntime::new(
            SessionContext::new(user_id),
            self.storage.clone(),
            self.client.clone(),
            event_rx,
            &event_tx,
            snapshot_tx,
        );
        tokio::spawn(runtime.run());

        let saved: Arc<dyn SavedContentStore> = Arc::new(self.storage.clone());
        let handle = SessionHandle {
            event_tx,
            snapshot_rx,
            saved,
        };
        sessions.insert(
            user_id.to_string(),
            SessionEntry {
                handle: handle.clone(),
                last_used: AtomicU64::new(self.elapsed_ms()),
            },
        );
        tracing::info!(user_id = %user_id, "Created session");
        handle
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions not used for at least `max_idle`, returning how many went
    ///
    /// Sessions with a reply outstanding are kept. An evicted runtime stops
    /// once no caller still holds its handle; the next request for that user
    /// starts a fresh session with no course selected.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.elapsed_ms();
        let max_idle_ms = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|user_id, entry| {
            let idle_ms = now.saturating_sub(entry.last_used.load(Ordering::Relaxed));
            let keep = idle_ms < max_idle_ms || entry.handle.snapshot().loading;
            if !keep {
                tracing::info!(user_id = %user_id, idle_ms = idle_ms, "Evicting idle session");
            }
            keep
        });
        before - sessions.len()
    }

    /// Periodically evict sessions idle for longer than `max_idle`
    pub fn spawn_idle_sweeper(self: Arc<Self>, max_idle: Duration) {
        let period = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = self.evict_idle(max_idle).await;
                if evicted > 0 {
                    let remaining = self.session_count().await;
                    tracing::debug!(
                        evicted = evicted,
                        remaining = remaining,
                        "Idle session sweep"
                    );
                }
            }
        });
    }
}
