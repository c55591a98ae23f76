//! Matchmaker: pairs waiting participants and creates sessions.

use crate::arena::Arena;
use imitation_core::conversation::NewConversation;
use imitation_core::error::{ArenaError, Result};
use imitation_core::profile::DEFAULT_PROFILE_ID;
use imitation_core::protocol::ServerEvent;
use imitation_core::session::{
    AUTOMATION_PARTICIPANT_ID, PairingKind, Session, WaitingEntry,
};
use rand::Rng;
use uuid::Uuid;

const WAITING_MESSAGE: &str = "Waiting for another player to join...";

enum Pairing {
    Automation,
    Humans(WaitingEntry, WaitingEntry),
    Waiting,
}

impl Arena {
    /// Handles `JOIN_MATCHMAKING`.
    ///
    /// A participant who is already waiting or already in an active session
    /// is ignored.
    pub async fn request_match(&self, participant_id: &str) -> Result<()> {
        let pairing = {
            let mut state = self.state().await;
            if state.waiting.contains(participant_id)
                || state.pending.contains(participant_id)
                || state.registry.active_session_of(participant_id).is_some()
            {
                tracing::debug!(participant_id, "Ignoring duplicate matchmaking request");
                return Ok(());
            }

            let probability = self.config().matchmaking.automation_probability;
            if rand::thread_rng().gen_bool(probability) {
                state.pending.insert(participant_id.to_string());
                Pairing::Automation
            } else {
                state.waiting.push_back(WaitingEntry::new(
                    participant_id,
                    PairingKind::HumanSeekingHuman,
                ));
                match state.waiting.take_pair() {
                    Some((first, second)) => {
                        state.pending.insert(first.participant_id.clone());
                        state.pending.insert(second.participant_id.clone());
                        Pairing::Humans(first, second)
                    }
                    None => Pairing::Waiting,
                }
            }
        };

        match pairing {
            Pairing::Automation => self.create_automation_session(participant_id).await,
            Pairing::Humans(first, second) => self.create_human_session(first, second).await,
            Pairing::Waiting => {
                tracing::info!(participant_id, "Waiting for a human opponent");
                self.hub().send(
                    participant_id,
                    ServerEvent::WaitingForPlayer {
                        message: WAITING_MESSAGE.to_string(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Handles `CANCEL_MATCHMAKING`. Never fails.
    pub async fn cancel_match(&self, participant_id: &str) {
        let mut state = self.state().await;
        let was_waiting = state.waiting.remove(participant_id);
        let was_pending = state.pending.remove(participant_id);
        if was_waiting || was_pending {
            tracing::info!(participant_id, "Matchmaking cancelled");
        }
    }

    async fn create_automation_session(&self, participant_id: &str) -> Result<()> {
        let profile_id = match self.gateway().random_automation_profile().await {
            Ok(Some(profile)) => profile.id,
            Ok(None) => DEFAULT_PROFILE_ID.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "Profile catalog unavailable, using default profile");
                DEFAULT_PROFILE_ID.to_string()
            }
        };

        let session_id = Uuid::new_v4().to_string();
        let created = self
            .gateway()
            .create_conversation(NewConversation {
                session_id: session_id.clone(),
                first_participant_id: participant_id.to_string(),
                second_participant_id: AUTOMATION_PARTICIPANT_ID.to_string(),
                first_is_automation: false,
                second_is_automation: true,
                automation_profile_id: Some(profile_id.clone()),
            })
            .await;

        let mut state = self.state().await;
        let still_waiting = state.pending.remove(participant_id);

        let created = match created {
            Ok(created) => created,
            Err(err) => {
                tracing::error!(participant_id, error = %err, "Failed to create automation session");
                let err = ArenaError::match_creation(err.to_string());
                if still_waiting {
                    self.hub()
                        .send(participant_id, ServerEvent::error(err.client_message()));
                }
                return Err(err);
            }
        };

        if !still_waiting {
            tracing::info!(participant_id, session_id = %session_id, "Participant left before the match was ready");
            return Ok(());
        }

        let session = Session::with_automation(
            session_id.clone(),
            created.conversation_id.clone(),
            participant_id,
            profile_id.clone(),
            created.created_at,
        );
        let entry = state.registry.create(session, self.root_token());
        let room_token = entry.timers.room_token();
        self.spawn_room_timer(session_id.clone(), room_token);

        tracing::info!(
            participant_id,
            session_id = %session_id,
            profile_id = %profile_id,
            "Matched with automated respondent"
        );
        self.hub().send(
            participant_id,
            ServerEvent::MatchFound {
                session_id,
                conversation_id: created.conversation_id,
                is_automation: true,
                is_first_turn: true,
                time_left: self.config().timing.room_time_limit_secs,
            },
        );
        Ok(())
    }

    /// Creates a session for two reserved participants.
    ///
    /// If one of them leaves while the record is being written, the other
    /// goes back to the head of the queue and pairing is retried.
    async fn create_human_session(&self, first: WaitingEntry, second: WaitingEntry) -> Result<()> {
        let mut next = Some((first, second));

        while let Some((first, second)) = next.take() {
            let first_turn = if rand::thread_rng().gen_bool(0.5) {
                first.participant_id.clone()
            } else {
                second.participant_id.clone()
            };
            let session_id = Uuid::new_v4().to_string();
            let created = self
                .gateway()
                .create_conversation(NewConversation {
                    session_id: session_id.clone(),
                    first_participant_id: first.participant_id.clone(),
                    second_participant_id: second.participant_id.clone(),
                    first_is_automation: false,
                    second_is_automation: false,
                    automation_profile_id: None,
                })
                .await;

            let mut state = self.state().await;
            let first_waiting = state.pending.remove(&first.participant_id);
            let second_waiting = state.pending.remove(&second.participant_id);

            let created = match created {
                Ok(created) => created,
                Err(err) => {
                    tracing::error!(session_id = %session_id, error = %err, "Failed to create human session");
                    let err = ArenaError::match_creation(err.to_string());
                    for (entry, waiting) in [(&first, first_waiting), (&second, second_waiting)] {
                        if waiting {
                            self.hub().send(
                                &entry.participant_id,
                                ServerEvent::error(err.client_message()),
                            );
                        }
                    }
                    return Err(err);
                }
            };

            if !(first_waiting && second_waiting) {
                let survivor = match (first_waiting, second_waiting) {
                    (true, false) => Some(first),
                    (false, true) => Some(second),
                    _ => None,
                };
                if let Some(survivor) = survivor {
                    tracing::info!(
                        participant_id = %survivor.participant_id,
                        "Opponent left before the match was ready, requeueing"
                    );
                    self.hub().send(
                        &survivor.participant_id,
                        ServerEvent::WaitingForPlayer {
                            message: WAITING_MESSAGE.to_string(),
                        },
                    );
                    state.waiting.push_front(survivor);
                    if let Some((a, b)) = state.waiting.take_pair() {
                        state.pending.insert(a.participant_id.clone());
                        state.pending.insert(b.participant_id.clone());
                        next = Some((a, b));
                    }
                }
                continue;
            }

            let session = Session::between_humans(
                session_id.clone(),
                created.conversation_id.clone(),
                first.participant_id.clone(),
                second.participant_id.clone(),
                first_turn.clone(),
                created.created_at,
            )?;
            let entry = state.registry.create(session, self.root_token());
            let room_token = entry.timers.room_token();
            self.spawn_room_timer(session_id.clone(), room_token);

            tracing::info!(
                session_id = %session_id,
                first = %first.participant_id,
                second = %second.participant_id,
                first_turn = %first_turn,
                "Matched two humans"
            );
            for participant in [&first.participant_id, &second.participant_id] {
                self.hub().send(
                    participant,
                    ServerEvent::MatchFound {
                        session_id: session_id.clone(),
                        conversation_id: created.conversation_id.clone(),
                        is_automation: false,
                        is_first_turn: *participant == first_turn,
                        time_left: self.config().timing.room_time_limit_secs,
                    },
                );
            }
        }

        Ok(())
    }
}
