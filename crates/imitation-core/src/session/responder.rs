use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the automated respondent is in its reply sequence.
///
/// The sequence always runs forward:
/// `Idle → TypingStarted → Composing → ReplySent → TurnReturned`, and a
/// session goes back to `Idle` only once the human takes the turn again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponderState {
    #[default]
    Idle,
    TypingStarted,
    Composing,
    ReplySent,
    TurnReturned,
}

impl ResponderState {
    /// Returns true while a reply is being produced for the current turn.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::TypingStarted | Self::Composing | Self::ReplySent)
    }
}

impl fmt::Display for ResponderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::TypingStarted => "typing_started",
            Self::Composing => "composing",
            Self::ReplySent => "reply_sent",
            Self::TurnReturned => "turn_returned",
        };
        f.write_str(name)
    }
}
