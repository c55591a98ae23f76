//! Persisted conversation records.

use crate::error::{ArenaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Arguments for creating a conversation record at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversation {
    pub session_id: String,
    pub first_participant_id: String,
    pub second_participant_id: String,
    pub first_is_automation: bool,
    pub second_is_automation: bool,
    pub automation_profile_id: Option<String>,
}

/// What the store hands back after creating a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedConversation {
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
}

/// The persisted ground truth of one conversation.
///
/// Mirrors the session identity plus, per participant, whether they were
/// automated and (once submitted) their guess and its correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    pub session_id: String,
    pub first_participant_id: String,
    pub second_participant_id: String,
    pub first_is_automation: bool,
    pub second_is_automation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_profile_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_guess: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_guess: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_guess_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_guess_correct: Option<bool>,
}

/// A participant's verdict, scored against the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessRecord {
    pub participant_id: String,
    pub guessed_is_automation: bool,
    pub correct: bool,
}

impl ConversationRecord {
    pub fn new(conversation_id: impl Into<String>, new: NewConversation, created_at: DateTime<Utc>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            session_id: new.session_id,
            first_participant_id: new.first_participant_id,
            second_participant_id: new.second_participant_id,
            first_is_automation: new.first_is_automation,
            second_is_automation: new.second_is_automation,
            automation_profile_id: new.automation_profile_id,
            created_at,
            first_guess: None,
            second_guess: None,
            first_guess_correct: None,
            second_guess_correct: None,
        }
    }

    pub fn involves(&self, participant_id: &str) -> bool {
        self.first_participant_id == participant_id || self.second_participant_id == participant_id
    }

    /// Ground truth about the counterpart of `participant_id`.
    pub fn opponent_is_automation(&self, participant_id: &str) -> Option<bool> {
        if self.first_participant_id == participant_id {
            Some(self.second_is_automation)
        } else if self.second_participant_id == participant_id {
            Some(self.first_is_automation)
        } else {
            None
        }
    }

    pub fn is_automation_game(&self) -> bool {
        self.first_is_automation || self.second_is_automation
    }

    pub fn guess_of(&self, participant_id: &str) -> Option<GuessRecord> {
        let (guess, correct) = if self.first_participant_id == participant_id {
            (self.first_guess, self.first_guess_correct)
        } else if self.second_participant_id == participant_id {
            (self.second_guess, self.second_guess_correct)
        } else {
            return None;
        };
        Some(GuessRecord {
            participant_id: participant_id.to_string(),
            guessed_is_automation: guess?,
            correct: correct?,
        })
    }

    pub fn guesses(&self) -> Vec<GuessRecord> {
        [&self.first_participant_id, &self.second_participant_id]
            .into_iter()
            .filter_map(|p| self.guess_of(p))
            .collect()
    }

    /// Scores and stores a guess. A guess already on record is kept as is.
    pub fn apply_guess(&mut self, participant_id: &str, guessed_is_automation: bool) -> Result<GuessRecord> {
        if let Some(existing) = self.guess_of(participant_id) {
            return Ok(existing);
        }
        let Some(opponent_is_automation) = self.opponent_is_automation(participant_id) else {
            return Err(ArenaError::validation(format!(
                "'{}' did not take part in conversation {}",
                participant_id, self.conversation_id
            )));
        };
        let correct = guessed_is_automation == opponent_is_automation;

        if self.first_participant_id == participant_id {
            self.first_guess = Some(guessed_is_automation);
            self.first_guess_correct = Some(correct);
        } else {
            self.second_guess = Some(guessed_is_automation);
            self.second_guess_correct = Some(correct);
        }

        Ok(GuessRecord {
            participant_id: participant_id.to_string(),
            guessed_is_automation,
            correct,
        })
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_is_first: bool,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Aggregate results across all stored conversations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Conversations with at least one guess
    pub finished_games: u64,
    pub total_guesses: u64,
    pub correct_guesses: u64,
    pub automation_games: u64,
    pub human_games: u64,
}

impl GameStatistics {
    pub fn record(&mut self, record: &ConversationRecord) {
        if record.is_automation_game() {
            self.automation_games += 1;
        } else {
            self.human_games += 1;
        }
        let guesses = record.guesses();
        if !guesses.is_empty() {
            self.finished_games += 1;
        }
        self.total_guesses += guesses.len() as u64;
        self.correct_guesses += guesses.iter().filter(|g| g.correct).count() as u64;
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ConversationRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.record(record);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AUTOMATION_PARTICIPANT_ID;

    fn automation_record() -> ConversationRecord {
        ConversationRecord::new(
            "c1",
            NewConversation {
                session_id: "c1".to_string(),
                first_participant_id: "alice".to_string(),
                second_participant_id: AUTOMATION_PARTICIPANT_ID.to_string(),
                first_is_automation: false,
                second_is_automation: true,
                automation_profile_id: Some("default".to_string()),
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_guess_is_scored_against_opponent() {
        let mut record = automation_record();
        let guess = record.apply_guess("alice", true).unwrap();
        assert!(guess.correct);
        assert_eq!(record.first_guess, Some(true));
        assert_eq!(record.first_guess_correct, Some(true));
        assert_eq!(record.second_guess, None);
    }

    #[test]
    fn test_guess_is_immutable_once_written() {
        let mut record = automation_record();
        record.apply_guess("alice", false).unwrap();
        let second = record.apply_guess("alice", true).unwrap();
        assert!(!second.guessed_is_automation);
        assert!(!second.correct);
        assert_eq!(record.first_guess, Some(false));
    }

    #[test]
    fn test_outsider_guess_is_rejected() {
        let mut record = automation_record();
        assert!(record.apply_guess("mallory", true).unwrap_err().is_validation());
        assert_eq!(record.opponent_is_automation("mallory"), None);
    }

    #[test]
    fn test_statistics_count_finished_games() {
        let mut finished = automation_record();
        finished.apply_guess("alice", false).unwrap();
        let open = ConversationRecord::new(
            "c2",
            NewConversation {
                session_id: "c2".to_string(),
                first_participant_id: "bob".to_string(),
                second_participant_id: "carol".to_string(),
                first_is_automation: false,
                second_is_automation: false,
                automation_profile_id: None,
            },
            Utc::now(),
        );

        let stats = GameStatistics::from_records([&finished, &open]);
        assert_eq!(stats.finished_games, 1);
        assert_eq!(stats.total_guesses, 1);
        assert_eq!(stats.correct_guesses, 0);
        assert_eq!(stats.automation_games, 1);
        assert_eq!(stats.human_games, 1);
    }
}
