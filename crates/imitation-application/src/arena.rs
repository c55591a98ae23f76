//! The game engine.
//!
//! `Arena` is a cheap, cloneable handle. All mutable game state sits behind a
//! single async mutex that is never held across a Persistence Gateway or
//! Completion Service call; every handler re-validates the session after
//! such a call returns.

use crate::hub::ConnectionHub;
use crate::registry::SessionRegistry;
use imitation_core::completion::CompletionService;
use imitation_core::config::ArenaConfig;
use imitation_core::conversation::{ConversationRecord, GameStatistics, PersistenceGateway};
use imitation_core::error::Result;
use imitation_core::protocol::{ClientEvent, ServerEvent};
use imitation_core::session::{ResponderState, WaitingQueue};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Everything the handlers mutate.
#[derive(Default)]
pub(crate) struct ArenaState {
    pub(crate) waiting: WaitingQueue,
    /// Participants taken off the queue whose session is being created
    pub(crate) pending: HashSet<String>,
    pub(crate) registry: SessionRegistry,
    /// (session id, participant id) pairs that retired or timed out and so
    /// gave up their guess. Dropped when the participant disconnects.
    pub(crate) forfeited: HashSet<(String, String)>,
}

impl ArenaState {
    pub(crate) fn forfeit(&mut self, session_id: &str, participant_id: &str) {
        self.forfeited
            .insert((session_id.to_string(), participant_id.to_string()));
    }

    pub(crate) fn has_forfeited(&self, session_id: &str, participant_id: &str) -> bool {
        self.forfeited
            .iter()
            .any(|(s, p)| s == session_id && p == participant_id)
    }
}

struct ArenaInner {
    state: Mutex<ArenaState>,
    hub: ConnectionHub,
    gateway: Arc<dyn PersistenceGateway>,
    completion: Arc<dyn CompletionService>,
    config: Arc<ArenaConfig>,
    shutdown: CancellationToken,
}

/// Point-in-time counters, for logs and the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArenaSnapshot {
    pub connections: usize,
    pub waiting: usize,
    pub pending_matches: usize,
    pub sessions: usize,
    pub active_sessions: usize,
}

#[derive(Clone)]
pub struct Arena {
    inner: Arc<ArenaInner>,
}

impl Arena {
    pub fn new(
        config: ArenaConfig,
        gateway: Arc<dyn PersistenceGateway>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            inner: Arc::new(ArenaInner {
                state: Mutex::new(ArenaState::default()),
                hub: ConnectionHub::new(),
                gateway,
                completion,
                config: Arc::new(config),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.inner.config
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.inner.hub
    }

    pub(crate) fn gateway(&self) -> &dyn PersistenceGateway {
        self.inner.gateway.as_ref()
    }

    pub(crate) fn completion(&self) -> &dyn CompletionService {
        self.inner.completion.as_ref()
    }

    pub(crate) fn root_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    pub(crate) async fn state(&self) -> MutexGuard<'_, ArenaState> {
        self.inner.state.lock().await
    }

    /// Registers a participant connection and returns its event stream.
    pub fn connect(&self, participant_id: &str) -> Result<UnboundedReceiver<ServerEvent>> {
        let rx = self.hub().connect(participant_id)?;
        tracing::info!(participant_id, "Participant connected");
        Ok(rx)
    }

    /// Dispatches one inbound event. Failures are reported to the sender as `ERROR`.
    pub async fn handle(&self, participant_id: &str, event: ClientEvent) {
        let result = match event {
            ClientEvent::JoinMatchmaking => self.request_match(participant_id).await,
            ClientEvent::CancelMatchmaking => {
                self.cancel_match(participant_id).await;
                Ok(())
            }
            ClientEvent::SendMessage { text } => self.send_message(participant_id, &text).await,
            ClientEvent::TypingStatus { is_typing } => {
                self.typing_status(participant_id, is_typing).await
            }
            ClientEvent::MakeGuess {
                session_id,
                guessed_is_automation,
            } => self
                .submit_guess(participant_id, &session_id, guessed_is_automation)
                .await
                .map(|_| ()),
            ClientEvent::GetGuessResult {
                session_id,
                guessed_is_automation,
            } => self
                .guess_result(participant_id, &session_id, guessed_is_automation)
                .await
                .map(|_| ()),
            ClientEvent::Retire { timeout } => {
                self.retire(participant_id, timeout.unwrap_or(false)).await
            }
        };

        if let Err(err) = result {
            // The matchmaker notifies every affected participant itself.
            if err.is_match_creation() {
                return;
            }
            tracing::warn!(participant_id, error = %err, "Client event rejected");
            self.hub()
                .send(participant_id, ServerEvent::error(err.client_message()));
        }
    }

    pub async fn snapshot(&self) -> ArenaSnapshot {
        let state = self.state().await;
        self.snapshot_of(&state)
    }

    pub(crate) fn snapshot_of(&self, state: &ArenaState) -> ArenaSnapshot {
        ArenaSnapshot {
            connections: self.hub().len(),
            waiting: state.waiting.len(),
            pending_matches: state.pending.len(),
            sessions: state.registry.len(),
            active_sessions: state.registry.active_count(),
        }
    }

    /// Where the automated respondent of `session_id` is in its reply sequence.
    pub async fn responder_state(&self, session_id: &str) -> Option<ResponderState> {
        let state = self.state().await;
        state
            .registry
            .get(session_id)
            .filter(|e| e.session.is_automated())
            .map(|e| e.session.responder_state)
    }

    /// The session a participant is currently bound to, if any.
    pub async fn session_of(&self, participant_id: &str) -> Option<String> {
        let state = self.state().await;
        state.registry.session_of(participant_id).map(str::to_string)
    }

    /// The participant currently allowed to send in `session_id`.
    pub async fn turn_owner(&self, session_id: &str) -> Option<String> {
        let state = self.state().await;
        state
            .registry
            .get(session_id)
            .and_then(|e| e.session.turn_owner().map(str::to_string))
    }

    pub async fn statistics(&self) -> Result<GameStatistics> {
        self.gateway().statistics().await
    }

    /// Past conversations of a participant, newest first.
    pub async fn history(&self, participant_id: &str) -> Result<Vec<ConversationRecord>> {
        self.gateway()
            .conversations_for_participant(participant_id)
            .await
    }

    /// Stops every timer, responder and purge task.
    pub fn shutdown(&self) {
        tracing::info!("Arena shutting down");
        self.inner.shutdown.cancel();
    }
}
