//! Guess Resolver.
//!
//! A guess always gets an answer: from the persisted record when the write
//! succeeds, from a fresh read of the record when it does not, and an
//! "unknown" outcome when neither is available.

use crate::arena::Arena;
use imitation_core::conversation::{ConversationRecord, GuessOutcome};
use imitation_core::error::{ArenaError, Result};
use imitation_core::protocol::ServerEvent;

const GUESS_ENDED_MESSAGE: &str =
    "Your opponent has made their guess. You can now make your guess about your opponent.";

impl Arena {
    /// Handles `MAKE_GUESS`. The outcome is sent to the guesser only.
    pub async fn submit_guess(
        &self,
        participant_id: &str,
        session_id: &str,
        guessed_is_automation: bool,
    ) -> Result<GuessOutcome> {
        let live_conversation = {
            let mut state = self.state().await;
            if state.has_forfeited(session_id, participant_id) {
                return Err(ArenaError::validation(
                    "You cannot make a guess in this conversation",
                ));
            }
            match state.registry.get_mut(session_id) {
                Some(entry) => {
                    if !entry.session.is_participant(participant_id) {
                        return Err(ArenaError::validation("You are not part of this conversation"));
                    }
                    // Further conversation is moot once a guess is made.
                    entry.timers.cancel_activity();
                    if entry.session.deactivate() {
                        tracing::info!(session_id, participant_id, "Conversation ended by guess");
                        let opponent = entry
                            .session
                            .opponent_of(participant_id)
                            .filter(|o| !entry.session.has_concluded(o));
                        if let Some(opponent) = opponent {
                            self.hub().send(
                                opponent,
                                ServerEvent::ConversationEnded {
                                    can_guess: true,
                                    message: GUESS_ENDED_MESSAGE.to_string(),
                                },
                            );
                        }
                    }
                    Some(entry.session.conversation_id.clone())
                }
                None => None,
            }
        };

        // After teardown only the store knows the conversation id.
        let conversation_id = match live_conversation {
            Some(id) => Some(id),
            None => match self.gateway().get_conversation_by_session_id(session_id).await {
                Ok(record) => record.map(|r| r.conversation_id),
                Err(err) => {
                    tracing::warn!(session_id, error = %err, "Failed to look up conversation for guess");
                    None
                }
            },
        };

        let outcome = match conversation_id {
            Some(conversation_id) => match self
                .gateway()
                .submit_guess(&conversation_id, participant_id, guessed_is_automation)
                .await
            {
                Ok(record) => scored_outcome(&record, participant_id, guessed_is_automation),
                Err(err) => {
                    tracing::warn!(session_id, participant_id, error = %err, "Failed to store guess, reading record instead");
                    self.outcome_from_store(session_id, participant_id, guessed_is_automation)
                        .await
                }
            },
            None => GuessOutcome::unknown(guessed_is_automation),
        };

        {
            let mut state = self.state().await;
            if let Some(entry) = state.registry.get_mut(session_id) {
                entry.session.conclude(participant_id);
                let timing = &self.config().timing;
                let delay = if entry.session.is_settled() {
                    timing.teardown_grace()
                } else {
                    timing.post_expiry_retention()
                };
                self.schedule_purge(entry, delay);
            }
        }

        tracing::info!(
            session_id,
            participant_id,
            correct = ?outcome.correct,
            "Guess resolved"
        );
        self.hub()
            .send(participant_id, outcome.clone().into_event());
        Ok(outcome)
    }

    /// Handles `GET_GUESS_RESULT`. Read-only; a stored guess wins over the
    /// value in the request.
    pub async fn guess_result(
        &self,
        participant_id: &str,
        session_id: &str,
        guessed_is_automation: bool,
    ) -> Result<GuessOutcome> {
        let outcome = match self.gateway().get_conversation_by_session_id(session_id).await {
            Ok(Some(record)) => scored_outcome(&record, participant_id, guessed_is_automation),
            Ok(None) => GuessOutcome::unknown(guessed_is_automation),
            Err(err) => {
                tracing::warn!(session_id, participant_id, error = %err, "Failed to read conversation record");
                GuessOutcome::unknown(guessed_is_automation)
            }
        };
        self.hub()
            .send(participant_id, outcome.clone().into_event());
        Ok(outcome)
    }

    async fn outcome_from_store(
        &self,
        session_id: &str,
        participant_id: &str,
        guessed_is_automation: bool,
    ) -> GuessOutcome {
        match self.gateway().get_conversation_by_session_id(session_id).await {
            Ok(Some(record)) => scored_outcome(&record, participant_id, guessed_is_automation),
            Ok(None) => GuessOutcome::unknown(guessed_is_automation),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "Fallback record lookup failed");
                GuessOutcome::unknown(guessed_is_automation)
            }
        }
    }
}

/// Scores against the guess on record; `requested` only counts when none is stored.
fn scored_outcome(record: &ConversationRecord, participant_id: &str, requested: bool) -> GuessOutcome {
    let guessed = record
        .guess_of(participant_id)
        .map(|g| g.guessed_is_automation)
        .unwrap_or(requested);
    GuessOutcome::from_record(record, participant_id, guessed)
}
