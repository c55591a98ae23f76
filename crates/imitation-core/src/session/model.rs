//! Session domain model.
//!
//! A `Session` is one paired conversation held in memory while it is live.
//! It owns the turn state machine; the engine decides *when* to call these
//! methods, the session decides whether the call is legal.

use super::responder::ResponderState;
use crate::error::{ArenaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved participant id of the automated respondent.
pub const AUTOMATION_PARTICIPANT_ID: &str = "AI_OPPONENT";

/// One relayed message, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub text: String,
    pub sender_id: String,
    /// True when sent by the participant recorded first on the conversation
    pub sender_is_first: bool,
    pub timestamp: DateTime<Utc>,
}

/// An active (or recently ended) conversation between two participants.
///
/// Invariants:
/// - while `is_active`, exactly one participant owns the turn;
/// - `is_active` goes from true to false once and never back.
#[derive(Debug, Clone)]
pub struct Session {
    /// Process-unique session identifier
    pub id: String,
    /// Identifier of the persisted conversation record
    pub conversation_id: String,
    /// Human participants; one for automation sessions, two otherwise
    participants: Vec<String>,
    pub messages: Vec<SessionMessage>,
    turn_owner: Option<String>,
    is_active: bool,
    /// Who spoke first
    pub first_turn: String,
    pub created_at: DateTime<Utc>,
    pub automation_profile_id: Option<String>,
    send_in_flight: bool,
    /// Humans who have guessed, forfeited or retired
    concluded: HashSet<String>,
    pub responder_state: ResponderState,
}

impl Session {
    /// A human against the automated respondent. The human always starts.
    pub fn with_automation(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        human: impl Into<String>,
        automation_profile_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let human = human.into();
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            participants: vec![human.clone()],
            messages: Vec::new(),
            turn_owner: Some(human.clone()),
            is_active: true,
            first_turn: human,
            created_at,
            automation_profile_id: Some(automation_profile_id.into()),
            send_in_flight: false,
            concluded: HashSet::new(),
            responder_state: ResponderState::Idle,
        }
    }

    /// Two humans. `first_turn` must be one of them.
    pub fn between_humans(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
        first_turn: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let first = first.into();
        let second = second.into();
        let first_turn = first_turn.into();
        if first == second {
            return Err(ArenaError::validation("A participant cannot be paired with itself"));
        }
        if first_turn != first && first_turn != second {
            return Err(ArenaError::validation(format!(
                "First turn owner '{}' is not a participant",
                first_turn
            )));
        }
        Ok(Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            participants: vec![first, second],
            messages: Vec::new(),
            turn_owner: Some(first_turn.clone()),
            is_active: true,
            first_turn,
            created_at,
            automation_profile_id: None,
            send_in_flight: false,
            concluded: HashSet::new(),
            responder_state: ResponderState::Idle,
        })
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn is_participant(&self, participant_id: &str) -> bool {
        self.participants.iter().any(|p| p == participant_id)
    }

    /// True when the opponent is the automated respondent.
    pub fn is_automated(&self) -> bool {
        self.participants.len() == 1
    }

    /// Whether `participant_id` is recorded first on the conversation.
    pub fn is_first_participant(&self, participant_id: &str) -> bool {
        self.participants.first().is_some_and(|p| p == participant_id)
    }

    /// The other human, if there is one.
    pub fn opponent_of(&self, participant_id: &str) -> Option<&str> {
        if !self.is_participant(participant_id) {
            return None;
        }
        self.participants
            .iter()
            .find(|p| p.as_str() != participant_id)
            .map(String::as_str)
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn turn_owner(&self) -> Option<&str> {
        self.turn_owner.as_deref()
    }

    pub fn holds_turn(&self, participant_id: &str) -> bool {
        self.turn_owner.as_deref() == Some(participant_id)
    }

    /// Marks the session inactive. Returns false if it already was.
    pub fn deactivate(&mut self) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.turn_owner = None;
        self.send_in_flight = false;
        true
    }

    /// Hands the turn to `participant_id` (a human or the automated respondent).
    pub fn pass_turn(&mut self, participant_id: &str) -> Result<()> {
        self.ensure_active()?;
        let is_automation = participant_id == AUTOMATION_PARTICIPANT_ID && self.is_automated();
        if !is_automation && !self.is_participant(participant_id) {
            return Err(ArenaError::validation(format!(
                "'{}' cannot take a turn in session {}",
                participant_id, self.id
            )));
        }
        self.turn_owner = Some(participant_id.to_string());
        Ok(())
    }

    /// Claims the right to send one message. Released by [`Self::finish_send`]
    /// or [`Self::record_message`].
    pub fn begin_send(&mut self, participant_id: &str) -> Result<()> {
        if !self.is_participant(participant_id) {
            return Err(ArenaError::validation("You are not part of this conversation"));
        }
        self.ensure_active()?;
        if !self.holds_turn(participant_id) {
            return Err(ArenaError::validation("It's not your turn"));
        }
        if self.send_in_flight {
            return Err(ArenaError::validation("Your previous message is still being sent"));
        }
        self.send_in_flight = true;
        Ok(())
    }

    /// Releases a claim from [`Self::begin_send`] without recording anything.
    pub fn finish_send(&mut self) {
        self.send_in_flight = false;
    }

    pub fn is_send_in_flight(&self) -> bool {
        self.send_in_flight
    }

    /// Appends a message to the history and releases the send claim.
    pub fn record_message(
        &mut self,
        sender_id: &str,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> &SessionMessage {
        self.send_in_flight = false;
        self.messages.push(SessionMessage {
            text: text.into(),
            sender_id: sender_id.to_string(),
            sender_is_first: self.is_first_participant(sender_id),
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Records that a human will take no further part (guessed, forfeited, retired).
    pub fn conclude(&mut self, participant_id: &str) {
        if self.is_participant(participant_id) {
            self.concluded.insert(participant_id.to_string());
        }
    }

    pub fn has_concluded(&self, participant_id: &str) -> bool {
        self.concluded.contains(participant_id)
    }

    /// True once every human has guessed, forfeited or retired.
    pub fn is_settled(&self) -> bool {
        self.participants.iter().all(|p| self.concluded.contains(p))
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.is_active {
            return Err(ArenaError::validation("This conversation has ended"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn human_pair() -> Session {
        Session::between_humans("s1", "s1", "alice", "bob", "bob", Utc::now()).unwrap()
    }

    #[test]
    fn test_automation_session_starts_with_human_turn() {
        let session = Session::with_automation("s1", "s1", "alice", "default", Utc::now());
        assert!(session.is_automated());
        assert!(session.holds_turn("alice"));
        assert_eq!(session.opponent_of("alice"), None);
        assert_eq!(session.first_turn, "alice");
    }

    #[test]
    fn test_between_humans_rejects_foreign_first_turn() {
        let err =
            Session::between_humans("s1", "s1", "alice", "bob", "carol", Utc::now()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_send_requires_turn_and_single_flight() {
        let mut session = human_pair();
        assert!(session.begin_send("alice").is_err());
        session.begin_send("bob").unwrap();
        assert!(session.begin_send("bob").is_err());

        let message = session.record_message("bob", "hi", Utc::now());
        assert!(!message.sender_is_first);
        assert!(!session.is_send_in_flight());
    }

    #[test]
    fn test_outsider_cannot_send() {
        let mut session = human_pair();
        let err = session.begin_send("mallory").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_deactivate_happens_once_and_clears_turn() {
        let mut session = human_pair();
        assert!(session.deactivate());
        assert!(!session.deactivate());
        assert!(!session.is_active());
        assert_eq!(session.turn_owner(), None);
        assert!(session.pass_turn("alice").is_err());
        assert!(session.begin_send("bob").is_err());
    }

    #[test]
    fn test_automation_can_hold_turn_only_in_automation_session() {
        let mut solo = Session::with_automation("s1", "s1", "alice", "default", Utc::now());
        solo.pass_turn(AUTOMATION_PARTICIPANT_ID).unwrap();
        assert!(solo.holds_turn(AUTOMATION_PARTICIPANT_ID));
        assert!(!solo.holds_turn("alice"));

        let mut pair = human_pair();
        assert!(pair.pass_turn(AUTOMATION_PARTICIPANT_ID).is_err());
    }

    #[test]
    fn test_settled_after_every_human_concludes() {
        let mut session = human_pair();
        session.conclude("alice");
        assert!(!session.is_settled());
        session.conclude("mallory");
        assert!(!session.is_settled());
        session.conclude("bob");
        assert!(session.is_settled());
    }
}
