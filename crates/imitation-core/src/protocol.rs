//! Realtime wire protocol.
//!
//! Frames are JSON objects tagged by a `type` field in SCREAMING_SNAKE_CASE,
//! with camelCase payload fields next to the tag:
//!
//! ```json
//! {"type":"SEND_MESSAGE","text":"hello"}
//! {"type":"TURN_TIME_UPDATE","timeLeft":4,"isLowTime":true}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events a participant sends to the arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    JoinMatchmaking,
    CancelMatchmaking,
    SendMessage {
        text: String,
    },
    TypingStatus {
        is_typing: bool,
    },
    MakeGuess {
        session_id: String,
        guessed_is_automation: bool,
    },
    /// Idempotent re-query of a previously submitted guess
    GetGuessResult {
        session_id: String,
        guessed_is_automation: bool,
    },
    Retire {
        /// Set by clients that retire because their own countdown ran out
        #[serde(default)]
        timeout: Option<bool>,
    },
}

/// Ground truth about an opponent, as reported back to a guesser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActualKind {
    Automation,
    Human,
    /// No record was available to score against
    Unknown,
}

impl ActualKind {
    pub fn from_flag(is_automation: bool) -> Self {
        if is_automation {
            Self::Automation
        } else {
            Self::Human
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Automation => "an AI",
            Self::Human => "a human",
            Self::Unknown => "unknown",
        }
    }
}

/// Events the arena pushes to a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    MatchFound {
        session_id: String,
        conversation_id: String,
        is_automation: bool,
        is_first_turn: bool,
        time_left: u64,
    },
    WaitingForPlayer {
        message: String,
    },
    ReceiveMessage {
        text: String,
        timestamp: DateTime<Utc>,
        is_self: bool,
    },
    OpponentTyping {
        is_typing: bool,
    },
    YourTurn {
        can_send_message: bool,
        time_left: u64,
    },
    TimeUpdate {
        time_left: u64,
    },
    TurnTimeUpdate {
        time_left: u64,
        is_low_time: bool,
    },
    TurnTimeUp,
    ForfeitResult {
        message: String,
    },
    OpponentForfeit {
        can_guess: bool,
    },
    ConversationEnded {
        can_guess: bool,
        message: String,
    },
    OpponentDisconnected {
        can_guess: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_automation: Option<bool>,
        message: String,
    },
    GuessResult {
        /// `None` when the outcome could not be scored
        correct: Option<bool>,
        guessed_value: bool,
        actual_kind: ActualKind,
        message: String,
    },
    GameOver {
        can_guess: bool,
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire name of the event, for logs and assertions.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MatchFound { .. } => "MATCH_FOUND",
            Self::WaitingForPlayer { .. } => "WAITING_FOR_PLAYER",
            Self::ReceiveMessage { .. } => "RECEIVE_MESSAGE",
            Self::OpponentTyping { .. } => "OPPONENT_TYPING",
            Self::YourTurn { .. } => "YOUR_TURN",
            Self::TimeUpdate { .. } => "TIME_UPDATE",
            Self::TurnTimeUpdate { .. } => "TURN_TIME_UPDATE",
            Self::TurnTimeUp => "TURN_TIME_UP",
            Self::ForfeitResult { .. } => "FORFEIT_RESULT",
            Self::OpponentForfeit { .. } => "OPPONENT_FORFEIT",
            Self::ConversationEnded { .. } => "CONVERSATION_ENDED",
            Self::OpponentDisconnected { .. } => "OPPONENT_DISCONNECTED",
            Self::GuessResult { .. } => "GUESS_RESULT",
            Self::GameOver { .. } => "GAME_OVER",
            Self::Error { .. } => "ERROR",
        }
    }

    /// Progress ticks are high volume and logged at a lower level.
    pub fn is_tick(&self) -> bool {
        matches!(self, Self::TimeUpdate { .. } | Self::TurnTimeUpdate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_wire_shape() {
        let event: ClientEvent = serde_json::from_value(json!({
            "type": "MAKE_GUESS",
            "sessionId": "abc",
            "guessedIsAutomation": true
        }))
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::MakeGuess {
                session_id: "abc".to_string(),
                guessed_is_automation: true
            }
        );

        let join: ClientEvent =
            serde_json::from_value(json!({"type": "JOIN_MATCHMAKING"})).unwrap();
        assert_eq!(join, ClientEvent::JoinMatchmaking);
    }

    #[test]
    fn test_retire_timeout_is_optional() {
        let bare: ClientEvent = serde_json::from_value(json!({"type": "RETIRE"})).unwrap();
        assert_eq!(bare, ClientEvent::Retire { timeout: None });

        let timed: ClientEvent =
            serde_json::from_value(json!({"type": "RETIRE", "timeout": true})).unwrap();
        assert_eq!(timed, ClientEvent::Retire { timeout: Some(true) });
    }

    #[test]
    fn test_unknown_client_event_is_rejected() {
        let result = serde_json::from_value::<ClientEvent>(json!({"type": "SPECTATE"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_wire_shape() {
        let value = serde_json::to_value(ServerEvent::TurnTimeUpdate {
            time_left: 4,
            is_low_time: true,
        })
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "TURN_TIME_UPDATE", "timeLeft": 4, "isLowTime": true})
        );

        let value = serde_json::to_value(ServerEvent::TurnTimeUp).unwrap();
        assert_eq!(value, json!({"type": "TURN_TIME_UP"}));
    }

    #[test]
    fn test_opponent_disconnected_omits_unknown_kind() {
        let value = serde_json::to_value(ServerEvent::OpponentDisconnected {
            can_guess: true,
            is_automation: None,
            message: "bye".to_string(),
        })
        .unwrap();
        assert!(value.get("isAutomation").is_none());
        assert_eq!(value["canGuess"], json!(true));
    }

    #[test]
    fn test_guess_result_kind_names() {
        let value = serde_json::to_value(ServerEvent::GuessResult {
            correct: None,
            guessed_value: false,
            actual_kind: ActualKind::Unknown,
            message: "?".to_string(),
        })
        .unwrap();
        assert_eq!(value["actualKind"], json!("UNKNOWN"));
        assert_eq!(value["correct"], json!(null));
    }
}
