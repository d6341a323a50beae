//! Session runtime executor

use super::traits::PairStore;
use super::SessionSnapshot;

use crate::history;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::session::{transition, Effect, Event, Session, SessionContext, TransitionError};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Drives one user's session: applies events, executes effects, publishes
/// snapshots
///
/// Background tasks hold only a weak sender, so the loop stops once every
/// handle is dropped.
pub struct SessionRuntime<S, C>
where
    S: PairStore + Clone + 'static,
    C: CompletionClient + ?Sized + 'static,
{
    context: SessionContext,
    session: Session,
    storage: S,
    client: Arc<C>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::WeakSender<Event>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<S, C> SessionRuntime<S, C>
where
    S: PairStore + Clone + 'static,
    C: CompletionClient + ?Sized + 'static,
{
    pub fn new(
        context: SessionContext,
        storage: S,
        client: Arc<C>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: &mpsc::Sender<Event>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            context,
            session: Session::new(),
            storage,
            client,
            event_rx,
            event_tx: event_tx.downgrade(),
            snapshot_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(user_id = %self.context.user_id, "Starting session runtime");

        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event).await;
        }

        tracing::info!(user_id = %self.context.user_id, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) {
        // Inline effects can yield follow-up events; handle them before the
        // next queued event
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            if let Event::CompletionFailed {
                key,
                request_id,
                error,
                ..
            } = &current_event
            {
                tracing::warn!(
                    user_id = %key.user_id,
                    course_id = %key.course_id,
                    request_id = request_id,
                    error = %error,
                    "Completion request failed"
                );
            }

            let result = match transition(&self.session, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    self.log_rejection(&e);
                    continue;
                }
            };

            self.session = result.new_session;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    fn log_rejection(&self, error: &TransitionError) {
        let token = self.session.state.key().map(|k| k.token);
        match error {
            TransitionError::StaleResult => {
                tracing::debug!(user_id = %self.context.user_id, token = ?token, "Discarding stale result");
            }
            _ => {
                tracing::debug!(user_id = %self.context.user_id, error = %error, "Ignoring event");
            }
        }
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Publish => {
                self.snapshot_tx
                    .send_replace(SessionSnapshot::capture(&self.context, &self.session));
                None
            }

            Effect::LoadHistory { key } => {
                match history::load(&self.storage, &key.user_id, &key.course_id).await {
                    Ok(turns) => Some(Event::HistoryLoaded { key, turns }),
                    Err(e) => {
                        // The session stays usable with an empty history
                        tracing::warn!(
                            user_id = %key.user_id,
                            course_id = %key.course_id,
                            error = %e,
                            "Failed to load conversation history"
                        );
                        None
                    }
                }
            }

            Effect::RequestCompletion {
                key,
                request_id,
                messages,
            } => {
                let client = self.client.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(
                        user_id = %key.user_id,
                        course_id = %key.course_id,
                        token = key.token,
                        request_id = request_id,
                        "Making completion request (background)"
                    );

                    let request = CompletionRequest::new(messages);
                    let turn_id = uuid::Uuid::new_v4().to_string();
                    let event = match client.complete(&request).await {
                        Ok(response) => Event::CompletionSucceeded {
                            key,
                            request_id,
                            reply: response.text,
                            turn_id,
                            at: Utc::now(),
                        },
                        Err(e) => Event::CompletionFailed {
                            key,
                            request_id,
                            error: e.to_string(),
                            turn_id,
                            at: Utc::now(),
                        },
                    };

                    if let Some(tx) = event_tx.upgrade() {
                        let _ = tx.send(event).await;
                    }
                });
                None
            }

            Effect::PersistPair {
                user_id,
                course_id,
                message,
                response,
            } => {
                let storage = self.storage.clone();
                tokio::spawn(async move {
                    match storage
                        .save_pair(&user_id, &course_id, &message, &response)
                        .await
                    {
                        Ok(pair) => {
                            tracing::debug!(pair_id = %pair.id, user_id = %user_id, course_id = %course_id, "Persisted conversation pair");
                        }
                        Err(e) => {
                            // Not retried; the displayed turns stay as they are
                            tracing::warn!(
                                user_id = %user_id,
                                course_id = %course_id,
                                error = %e,
                                "Failed to persist conversation pair"
                            );
                        }
                    }
                });
                None
            }
        }
    }
}
