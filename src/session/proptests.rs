//! Property-based tests for the session state machine

use super::*;
use crate::db::Course;
use crate::turn::TurnRole;
use chrono::Utc;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Send(String),
    Succeed(String),
    Fail,
    Switch(u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => "[a-z ]{0,12}".prop_map(Op::Send),
        3 => "[a-zA-Z=]{1,12}".prop_map(Op::Succeed),
        2 => Just(Op::Fail),
        1 => (0u8..3).prop_map(Op::Switch),
    ]
}

fn course(n: u8) -> Course {
    Course {
        id: format!("c{n}"),
        title: format!("Course {n}"),
        content: "content".to_string(),
        created_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Drive the machine the way the runtime does, resolving results against
/// the request that is outstanding when the op runs.
fn apply(session: &Session, ctx: &SessionContext, op: Op, seq: usize) -> Option<TransitionResult> {
    let event = match op {
        Op::Send(text) => Event::UserInput {
            text,
            turn_id: format!("u{seq}"),
            at: Utc::now(),
        },
        Op::Succeed(reply) => {
            let SessionState::Sending {
                key, request_id, ..
            } = &session.state
            else {
                return None;
            };
            Event::CompletionSucceeded {
                key: key.clone(),
                request_id: *request_id,
                reply,
                turn_id: format!("a{seq}"),
                at: Utc::now(),
            }
        }
        Op::Fail => {
            let SessionState::Sending {
                key, request_id, ..
            } = &session.state
            else {
                return None;
            };
            Event::CompletionFailed {
                key: key.clone(),
                request_id: *request_id,
                error: "failed".to_string(),
                turn_id: format!("a{seq}"),
                at: Utc::now(),
            }
        }
        Op::Switch(n) => Event::SelectCourse { course: course(n) },
    };
    transition(session, ctx, event).ok()
}

proptest! {
    #[test]
    fn prop_turn_count_matches_outcomes(ops in prop::collection::vec(arb_op(), 0..60)) {
        let ctx = SessionContext::new("u1");
        let mut session = transition(&Session::new(), &ctx, Event::SelectCourse { course: course(0) })
            .unwrap()
            .new_session;
        let mut successes = 0usize;
        let mut failures = 0usize;

        for (seq, op) in ops.into_iter().enumerate() {
            let was_sending = session.state.is_sending();
            let kind = op.clone();
            let Some(result) = apply(&session, &ctx, op, seq) else {
                continue;
            };
            match kind {
                Op::Switch(_) => {
                    successes = 0;
                    failures = 0;
                }
                Op::Succeed(_) if was_sending => successes += 1,
                Op::Fail if was_sending => failures += 1,
                _ => {}
            }
            session = result.new_session;

            // A failed send keeps its user turn and gains an apology
            let outstanding = usize::from(session.state.is_sending());
            prop_assert_eq!(session.turns.len(), 2 * successes + 2 * failures + outstanding);
        }
    }

    #[test]
    fn prop_roles_alternate_starting_with_user(ops in prop::collection::vec(arb_op(), 0..60)) {
        let ctx = SessionContext::new("u1");
        let mut session = transition(&Session::new(), &ctx, Event::SelectCourse { course: course(0) })
            .unwrap()
            .new_session;

        for (seq, op) in ops.into_iter().enumerate() {
            if let Some(result) = apply(&session, &ctx, op, seq) {
                session = result.new_session;
            }
            for (i, turn) in session.turns.iter().enumerate() {
                let expected = if i % 2 == 0 { TurnRole::User } else { TurnRole::Assistant };
                prop_assert_eq!(turn.role, expected);
            }
        }
    }
}
