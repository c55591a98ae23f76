//! Retirement and connection-close handling.

use crate::arena::Arena;
use imitation_core::error::Result;
use imitation_core::protocol::ServerEvent;

const OPPONENT_RETIRED_MESSAGE: &str =
    "Your opponent has retired from the game. You can now make your guess about your opponent.";
const RETIRED_MESSAGE: &str = "You have retired from the game. You cannot make a guess.";
const TIMED_OUT_MESSAGE: &str =
    "You ran out of time and have been retired from the game. You cannot make a guess.";
const OPPONENT_DISCONNECTED_MESSAGE: &str =
    "Your opponent has disconnected. You can now make your guess about your opponent.";

impl Arena {
    /// Handles `RETIRE`. The session is removed immediately.
    pub async fn retire(&self, participant_id: &str, timed_out: bool) -> Result<()> {
        let mut state = self.state().await;
        let Some(session_id) = state.registry.session_of(participant_id).map(str::to_string) else {
            state.waiting.remove(participant_id);
            state.pending.remove(participant_id);
            return Ok(());
        };

        if let Some(entry) = state.registry.get_mut(&session_id) {
            entry.session.conclude(participant_id);
            let opponent = entry
                .session
                .opponent_of(participant_id)
                .filter(|o| !entry.session.has_concluded(o));
            if let Some(opponent) = opponent {
                self.notify_opponent_left(opponent, OPPONENT_RETIRED_MESSAGE);
            }
        }
        state.registry.remove(&session_id);
        state.forfeit(&session_id, participant_id);

        tracing::info!(session_id = %session_id, participant_id, timed_out, "Participant retired");
        self.hub().send(
            participant_id,
            ServerEvent::GameOver {
                can_guess: false,
                message: if timed_out {
                    TIMED_OUT_MESSAGE
                } else {
                    RETIRED_MESSAGE
                }
                .to_string(),
            },
        );
        Ok(())
    }

    /// Handles connection close.
    ///
    /// Timers stop at once; the session itself lingers for the teardown
    /// grace window so the opponent can still guess against it.
    pub async fn disconnect(&self, participant_id: &str) {
        self.hub().disconnect(participant_id);

        let mut state = self.state().await;
        state.waiting.remove(participant_id);
        state.pending.remove(participant_id);
        state.forfeited.retain(|(_, p)| p != participant_id);

        if let Some(session_id) = state.registry.session_of(participant_id).map(str::to_string) {
            if let Some(entry) = state.registry.get_mut(&session_id) {
                entry.session.conclude(participant_id);
                entry.timers.cancel_activity();
                let was_active = entry.session.deactivate();

                let opponent = entry
                    .session
                    .opponent_of(participant_id)
                    .filter(|o| was_active && !entry.session.has_concluded(o));
                if let Some(opponent) = opponent {
                    self.notify_opponent_left(opponent, OPPONENT_DISCONNECTED_MESSAGE);
                }

                let grace = self.config().timing.teardown_grace();
                self.schedule_purge(entry, grace);
                tracing::info!(session_id = %session_id, participant_id, "Participant left an ongoing session");
            }
            state.registry.unbind(participant_id, &session_id);
        }

        let snapshot = self.snapshot_of(&state);
        tracing::info!(participant_id, ?snapshot, "Participant disconnected");
    }

    /// Grants guess rights to the remaining human and takes away their turn.
    fn notify_opponent_left(&self, opponent: &str, message: &str) {
        self.hub().send(
            opponent,
            ServerEvent::OpponentDisconnected {
                can_guess: true,
                is_automation: None,
                message: message.to_string(),
            },
        );
        self.hub().send(
            opponent,
            ServerEvent::YourTurn {
                can_send_message: false,
                time_left: 0,
            },
        );
    }
}
