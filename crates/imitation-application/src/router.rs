//! Message Router: relays chat and typing indicators between participants.

use crate::arena::Arena;
use chrono::Utc;
use imitation_core::error::{ArenaError, Result};
use imitation_core::protocol::ServerEvent;
use imitation_core::session::{AUTOMATION_PARTICIPANT_ID, ResponderState};

impl Arena {
    /// Handles `SEND_MESSAGE`.
    ///
    /// The message is persisted before anyone sees it. While the write is in
    /// flight the sender keeps the turn but cannot send again.
    pub async fn send_message(&self, participant_id: &str, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ArenaError::validation("Message cannot be empty"));
        }

        let (session_id, conversation_id, is_first) = {
            let mut state = self.state().await;
            let session_id = state
                .registry
                .session_of(participant_id)
                .map(str::to_string)
                .ok_or_else(|| ArenaError::validation("You are not in a conversation"))?;
            let entry = state
                .registry
                .get_mut(&session_id)
                .ok_or_else(|| ArenaError::validation("You are not in a conversation"))?;
            entry.session.begin_send(participant_id)?;
            (
                session_id,
                entry.session.conversation_id.clone(),
                entry.session.is_first_participant(participant_id),
            )
        };

        let stored = self
            .gateway()
            .create_message(&conversation_id, is_first, text, participant_id)
            .await;

        let mut state = self.state().await;
        if let Err(err) = stored {
            if let Some(entry) = state.registry.get_mut(&session_id) {
                entry.session.finish_send();
            }
            tracing::error!(session_id = %session_id, participant_id, error = %err, "Failed to persist message");
            return Err(err);
        }
        let Some(entry) = state.registry.get_mut(&session_id) else {
            tracing::debug!(session_id = %session_id, "Session gone while persisting message");
            return Ok(());
        };
        if !entry.session.is_active() {
            return Ok(());
        }

        let timestamp = Utc::now();
        entry.session.record_message(participant_id, text, timestamp);
        entry.timers.cancel_turn();
        self.hub().send(
            participant_id,
            ServerEvent::ReceiveMessage {
                text: text.to_string(),
                timestamp,
                is_self: true,
            },
        );

        if entry.session.is_automated() {
            entry.session.pass_turn(AUTOMATION_PARTICIPANT_ID)?;
            entry.session.responder_state = ResponderState::Idle;
            let token = entry.timers.start_responder();
            tracing::debug!(session_id = %session_id, "Turn passed to automated respondent");
            self.spawn_responder(session_id, participant_id.to_string(), token);
            return Ok(());
        }

        let Some(opponent) = entry.session.opponent_of(participant_id).map(str::to_string) else {
            return Ok(());
        };
        self.hub().send(
            &opponent,
            ServerEvent::ReceiveMessage {
                text: text.to_string(),
                timestamp,
                is_self: false,
            },
        );
        entry.session.pass_turn(&opponent)?;
        self.start_turn_timer(entry, &opponent);
        self.hub().send(
            &opponent,
            ServerEvent::YourTurn {
                can_send_message: true,
                time_left: self.config().timing.turn_time_limit_secs,
            },
        );
        Ok(())
    }

    /// Handles `TYPING_STATUS`. Relayed to a human opponent only.
    pub async fn typing_status(&self, participant_id: &str, is_typing: bool) -> Result<()> {
        let state = self.state().await;
        let entry = state
            .registry
            .active_session_of(participant_id)
            .and_then(|id| state.registry.get(id))
            .ok_or_else(|| ArenaError::validation("You are not in a conversation"))?;

        if let Some(opponent) = entry.session.opponent_of(participant_id) {
            self.hub()
                .send(opponent, ServerEvent::OpponentTyping { is_typing });
        }
        Ok(())
    }
}
