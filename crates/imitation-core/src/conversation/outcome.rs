use super::record::ConversationRecord;
use crate::protocol::{ActualKind, ServerEvent};

/// The answer returned to a guesser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    pub correct: Option<bool>,
    pub guessed_value: bool,
    pub actual_kind: ActualKind,
    pub message: String,
}

impl GuessOutcome {
    pub fn scored(guessed_is_automation: bool, opponent_is_automation: bool) -> Self {
        let correct = guessed_is_automation == opponent_is_automation;
        let actual_kind = ActualKind::from_flag(opponent_is_automation);
        Self {
            correct: Some(correct),
            guessed_value: guessed_is_automation,
            actual_kind,
            message: format!(
                "Your guess was {}! Your opponent was actually {}.",
                if correct { "correct" } else { "incorrect" },
                actual_kind.describe()
            ),
        }
    }

    /// Used when no ground truth can be found.
    pub fn unknown(guessed_is_automation: bool) -> Self {
        Self {
            correct: None,
            guessed_value: guessed_is_automation,
            actual_kind: ActualKind::Unknown,
            message: "We couldn't determine who your opponent was for this conversation."
                .to_string(),
        }
    }

    /// Scores against a persisted record, or `unknown` if `participant_id` is not on it.
    pub fn from_record(
        record: &ConversationRecord,
        participant_id: &str,
        guessed_is_automation: bool,
    ) -> Self {
        match record.opponent_is_automation(participant_id) {
            Some(opponent) => Self::scored(guessed_is_automation, opponent),
            None => Self::unknown(guessed_is_automation),
        }
    }

    pub fn into_event(self) -> ServerEvent {
        ServerEvent::GuessResult {
            correct: self.correct,
            guessed_value: self.guessed_value,
            actual_kind: self.actual_kind,
            message: self.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_outcome_truth_table() {
        for guess in [true, false] {
            for truth in [true, false] {
                let outcome = GuessOutcome::scored(guess, truth);
                assert_eq!(outcome.correct, Some(guess == truth));
                assert_eq!(outcome.actual_kind, ActualKind::from_flag(truth));
            }
        }
    }

    #[test]
    fn test_message_names_the_opponent() {
        let outcome = GuessOutcome::scored(false, true);
        assert_eq!(
            outcome.message,
            "Your guess was incorrect! Your opponent was actually an AI."
        );
    }

    #[test]
    fn test_unknown_outcome_has_no_verdict() {
        let outcome = GuessOutcome::unknown(true);
        assert_eq!(outcome.correct, None);
        assert_eq!(outcome.actual_kind, ActualKind::Unknown);
        assert!(outcome.guessed_value);
    }
}
