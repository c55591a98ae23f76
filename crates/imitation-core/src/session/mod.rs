//! Live session domain module.
//!
//! # Module Structure
//!
//! - `model`: The `Session` state machine and its message history
//! - `responder`: Progress of the automated respondent within a session
//! - `waiting`: The matchmaking queue entries

mod model;
mod responder;
mod waiting;

pub use model::{AUTOMATION_PARTICIPANT_ID, Session, SessionMessage};
pub use responder::ResponderState;
pub use waiting::{PairingKind, WaitingEntry, WaitingQueue};
