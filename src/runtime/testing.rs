//! Mock implementations for testing
//!
//! These mocks enable session tests without a network or a database.

use super::traits::*;
use super::{SessionHandle, SessionSnapshot};
use crate::db::{ConversationPair, Course, SavedContent};
use crate::llm::{CompletionClient, CompletionRequest, CompletionResponse, LlmError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Mock Completion Client
// ============================================================================

/// Mock completion client that returns queued replies
///
/// With [`hold_replies`](Self::hold_replies) each request waits for a
/// [`release_reply`](Self::release_reply) before answering.
pub struct MockCompletionClient {
    responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
    holding: AtomicBool,
    release: Notify,
    started: Notify,
    completed: AtomicUsize,
    completed_notify: Notify,
}

impl MockCompletionClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
            holding: AtomicBool::new(false),
            release: Notify::new(),
            started: Notify::new(),
            completed: AtomicUsize::new(0),
            completed_notify: Notify::new(),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResponse::text(text)));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hold_replies(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    /// Later requests answer immediately; already held ones still need a release
    pub fn stop_holding(&self) {
        self.holding.store(false, Ordering::SeqCst);
    }

    pub fn release_reply(&self) {
        self.release.notify_one();
    }

    pub async fn wait_for_request(&self) {
        tokio::time::timeout(WAIT_TIMEOUT, self.started.notified())
            .await
            .expect("completion request should start");
    }

    /// Wait until at least `count` requests have returned
    pub async fn wait_for_completions(&self, count: usize) {
        tokio::time::timeout(WAIT_TIMEOUT, async {
            loop {
                let notified = self.completed_notify.notified();
                if self.completed.load(Ordering::SeqCst) >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("completion requests should finish");
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")));
        self.started.notify_one();

        if self.holding.load(Ordering::SeqCst) {
            self.release.notified().await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        self.completed_notify.notify_waiters();
        response
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// In-Memory Storage
// ============================================================================

/// Storage backed by vectors, with switchable read and write failure
#[derive(Default)]
pub struct MemoryStorage {
    pairs: Mutex<Vec<ConversationPair>>,
    saved: Mutex<Vec<SavedContent>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    write_attempts: AtomicUsize,
    write_notify: Notify,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Insert a pair directly, as if written by an earlier session
    pub fn seed_pair(&self, user_id: &str, course_id: &str, message: &str, response: &str) {
        self.pairs.lock().unwrap().push(new_pair(user_id, course_id, message, response));
    }

    pub fn pairs(&self) -> Vec<ConversationPair> {
        self.pairs.lock().unwrap().clone()
    }

    pub fn saved(&self) -> Vec<SavedContent> {
        self.saved.lock().unwrap().clone()
    }

    /// Wait until at least `count` pair writes were attempted
    pub async fn wait_for_writes(&self, count: usize) {
        tokio::time::timeout(WAIT_TIMEOUT, async {
            loop {
                let notified = self.write_notify.notified();
                if self.write_attempts.load(Ordering::SeqCst) >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("pair writes should be attempted");
    }
}

fn new_pair(user_id: &str, course_id: &str, message: &str, response: &str) -> ConversationPair {
    ConversationPair {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
        message: message.to_string(),
        response: response.to_string(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl PairStore for MemoryStorage {
    async fn save_pair(
        &self,
        user_id: &str,
        course_id: &str,
        message: &str,
        response: &str,
    ) -> Result<ConversationPair, String> {
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err("simulated write failure".to_string())
        } else {
            let pair = new_pair(user_id, course_id, message, response);
            self.pairs.lock().unwrap().push(pair.clone());
            Ok(pair)
        };
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        self.write_notify.notify_waiters();
        result
    }

    async fn list_pairs(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<ConversationPair>, String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("simulated read failure".to_string());
        }
        Ok(self
            .pairs
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && p.course_id == course_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SavedContentStore for MemoryStorage {
    async fn save_content(
        &self,
        user_id: &str,
        course_id: &str,
        content: &str,
        title: &str,
    ) -> Result<SavedContent, String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("simulated write failure".to_string());
        }
        let saved = SavedContent {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            content: content.to_string(),
            title: title.to_string(),
            created_at: Utc::now(),
        };
        self.saved.lock().unwrap().push(saved.clone());
        Ok(saved)
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn test_course(id: &str, title: &str, content: &str) -> Course {
    Course {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        created_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Wait until the published snapshot satisfies `pred` and return it
pub async fn wait_for(
    handle: &SessionHandle,
    pred: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    let snapshot = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for session snapshot")
        .expect("session runtime stopped");
    snapshot.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[tokio::test]
    async fn test_mock_client_returns_queued_then_errors() {
        let mock = MockCompletionClient::new("test-model");
        mock.queue_reply("Hello!");

        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text, "Hello!");

        // Second call should fail (no more responses)
        assert!(mock.complete(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_storage_filters_pairs() {
        let storage = MemoryStorage::new();
        storage.seed_pair("u1", "c1", "q1", "a1");
        storage.seed_pair("u1", "c2", "q2", "a2");
        storage.seed_pair("u2", "c1", "q3", "a3");

        let pairs = storage.list_pairs("u1", "c1").await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].message, "q1");

        storage.fail_reads(true);
        assert!(storage.list_pairs("u1", "c1").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_storage_failed_write_is_counted() {
        let storage = MemoryStorage::new();
        storage.fail_writes(true);

        assert!(storage.save_pair("u1", "c1", "q", "a").await.is_err());
        storage.wait_for_writes(1).await;
        assert!(storage.pairs().is_empty());
    }
}
