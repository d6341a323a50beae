//! Per-user conversation session state machine
//!
//! Pure transitions: the runtime feeds events in and executes the effects
//! that come back out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{Session, SessionContext, SessionKey, SessionState};
pub use transition::{transition, TransitionError, TransitionResult, APOLOGY};
