//! Pure session transition function

use super::{Effect, Event, Session, SessionContext, SessionKey, SessionState};
use crate::context;
use crate::turn::Turn;
use thiserror::Error;

/// Assistant turn substituted for a failed completion
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Result of a session transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Guarded events; none of them change the session
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No course selected")]
    NoCourse,
    #[error("Input is empty")]
    EmptyInput,
    #[error("A message is already being sent")]
    Busy,
    #[error("Result belongs to a session that is no longer active")]
    StaleResult,
}

/// Pure transition function
///
/// Given the same session, context and event it always yields the same
/// result; all I/O is described by the returned effects.
#[allow(clippy::too_many_lines)] // One arm per (state, event) pair
pub fn transition(
    session: &Session,
    ctx: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (&session.state, event) {
        // Any state + SelectCourse -> Idle with an empty turn list.
        // An outstanding request keeps running but its key no longer matches.
        (_, Event::SelectCourse { course }) => {
            let token = session.last_token + 1;
            let key = SessionKey {
                user_id: ctx.user_id.clone(),
                course_id: course.id.clone(),
                token,
            };
            let next = Session {
                state: SessionState::Idle {
                    key: key.clone(),
                    course,
                },
                turns: Vec::new(),
                last_token: token,
                last_request_id: session.last_request_id,
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::Publish)
                .with_effect(Effect::LoadHistory { key }))
        }

        // Loaded history replaces the turn list outright
        (SessionState::Idle { key, .. }, Event::HistoryLoaded { key: loaded, turns }) => {
            if *key != loaded {
                return Err(TransitionError::StaleResult);
            }
            let mut next = session.clone();
            next.turns = turns;
            Ok(TransitionResult::new(next).with_effect(Effect::Publish))
        }

        (_, Event::HistoryLoaded { .. }) => Err(TransitionError::StaleResult),

        (SessionState::NoCourse, Event::UserInput { .. }) => Err(TransitionError::NoCourse),

        (SessionState::Sending { .. }, Event::UserInput { .. }) => Err(TransitionError::Busy),

        // Idle + UserInput -> Sending, user turn appended before the request goes out
        (SessionState::Idle { key, course }, Event::UserInput { text, turn_id, at }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            let messages = context::assemble(course, &session.turns, &text);
            let request_id = session.last_request_id + 1;

            let mut turns = session.turns.clone();
            turns.push(Turn::user(turn_id, text.clone(), at));

            let next = Session {
                state: SessionState::Sending {
                    key: key.clone(),
                    course: course.clone(),
                    request_id,
                    input: text,
                },
                turns,
                last_token: session.last_token,
                last_request_id: request_id,
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::Publish)
                .with_effect(Effect::RequestCompletion {
                    key: key.clone(),
                    request_id,
                    messages,
                }))
        }

        // Sending + matching success -> Idle, reply appended, pair persisted
        (
            SessionState::Sending {
                key,
                course,
                request_id,
                input,
            },
            Event::CompletionSucceeded {
                key: result_key,
                request_id: result_id,
                reply,
                turn_id,
                at,
            },
        ) => {
            if *key != result_key || *request_id != result_id {
                return Err(TransitionError::StaleResult);
            }
            let mut turns = session.turns.clone();
            turns.push(Turn::assistant(turn_id, reply.clone(), at));

            let next = Session {
                state: SessionState::Idle {
                    key: key.clone(),
                    course: course.clone(),
                },
                turns,
                last_token: session.last_token,
                last_request_id: session.last_request_id,
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::Publish)
                .with_effect(Effect::PersistPair {
                    user_id: key.user_id.clone(),
                    course_id: key.course_id.clone(),
                    message: input.clone(),
                    response: reply,
                }))
        }

        // Sending + matching failure -> Idle, apology appended, nothing persisted
        (
            SessionState::Sending {
                key,
                course,
                request_id,
                ..
            },
            Event::CompletionFailed {
                key: result_key,
                request_id: result_id,
                turn_id,
                at,
                ..
            },
        ) => {
            if *key != result_key || *request_id != result_id {
                return Err(TransitionError::StaleResult);
            }
            let mut turns = session.turns.clone();
            turns.push(Turn::assistant(turn_id, APOLOGY, at));

            let next = Session {
                state: SessionState::Idle {
                    key: key.clone(),
                    course: course.clone(),
                },
                turns,
                last_token: session.last_token,
                last_request_id: session.last_request_id,
            };
            Ok(TransitionResult::new(next).with_effect(Effect::Publish))
        }

        // Results arriving with nothing outstanding
        (
            SessionState::NoCourse | SessionState::Idle { .. },
            Event::CompletionSucceeded { .. } | Event::CompletionFailed { .. },
        ) => Err(TransitionError::StaleResult),
    }
}
