//! Session Registry.
//!
//! Owns every live `Session` together with the cancellation tokens of the
//! tasks working on it. Participants are indexed to the session they were
//! most recently matched into.

use imitation_core::session::Session;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Cancellation handles for the background tasks of one session.
///
/// Room, turn and responder tasks run on children of `activity`, so
/// cancelling it stops all of them. The purge task runs on a sibling token
/// that survives deactivation.
pub struct SessionTimers {
    activity: CancellationToken,
    turn: Option<CancellationToken>,
    responder: Option<CancellationToken>,
    purge: Option<CancellationToken>,
    root: CancellationToken,
}

impl SessionTimers {
    pub fn new(root: &CancellationToken) -> Self {
        Self {
            activity: root.child_token(),
            turn: None,
            responder: None,
            purge: None,
            root: root.clone(),
        }
    }

    pub fn room_token(&self) -> CancellationToken {
        self.activity.child_token()
    }

    /// Cancels the previous turn timer and returns a token for the next one.
    pub fn start_turn(&mut self) -> CancellationToken {
        self.cancel_turn();
        let token = self.activity.child_token();
        self.turn = Some(token.clone());
        token
    }

    pub fn cancel_turn(&mut self) {
        if let Some(token) = self.turn.take() {
            token.cancel();
        }
    }

    pub fn start_responder(&mut self) -> CancellationToken {
        if let Some(token) = self.responder.take() {
            token.cancel();
        }
        let token = self.activity.child_token();
        self.responder = Some(token.clone());
        token
    }

    /// Stops the room, turn and responder tasks.
    pub fn cancel_activity(&mut self) {
        self.activity.cancel();
        self.turn = None;
        self.responder = None;
    }

    pub fn is_activity_cancelled(&self) -> bool {
        self.activity.is_cancelled()
    }

    /// Replaces any scheduled purge and returns the token for the new one.
    pub fn reschedule_purge(&mut self) -> CancellationToken {
        if let Some(token) = self.purge.take() {
            token.cancel();
        }
        let token = self.root.child_token();
        self.purge = Some(token.clone());
        token
    }

    pub fn has_purge_scheduled(&self) -> bool {
        self.purge.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    fn cancel_all(&mut self) {
        self.cancel_activity();
        if let Some(token) = self.purge.take() {
            token.cancel();
        }
    }
}

pub struct SessionEntry {
    pub session: Session,
    pub timers: SessionTimers,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, SessionEntry>,
    by_participant: HashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `session` and binds its participants to it.
    pub fn create(&mut self, session: Session, root: &CancellationToken) -> &mut SessionEntry {
        let id = session.id.clone();
        for participant in session.participants() {
            self.by_participant.insert(participant.clone(), id.clone());
        }
        let entry = SessionEntry {
            session,
            timers: SessionTimers::new(root),
        };
        self.sessions.entry(id).insert_entry(entry).into_mut()
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionEntry> {
        self.sessions.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionEntry> {
        self.sessions.get_mut(session_id)
    }

    /// The session a participant was most recently matched into.
    pub fn session_of(&self, participant_id: &str) -> Option<&str> {
        self.by_participant.get(participant_id).map(String::as_str)
    }

    pub fn active_session_of(&self, participant_id: &str) -> Option<&str> {
        let session_id = self.session_of(participant_id)?;
        self.sessions
            .get(session_id)
            .filter(|e| e.session.is_active())
            .map(|e| e.session.id.as_str())
    }

    /// Drops the participant's binding if it still points at `session_id`.
    pub fn unbind(&mut self, participant_id: &str, session_id: &str) {
        if self.session_of(participant_id) == Some(session_id) {
            self.by_participant.remove(participant_id);
        }
    }

    /// Removes a session and cancels every task it owns.
    ///
    /// Returns `None` if it was already gone.
    pub fn remove(&mut self, session_id: &str) -> Option<SessionEntry> {
        let mut entry = self.sessions.remove(session_id)?;
        entry.timers.cancel_all();
        entry.session.deactivate();
        for participant in entry.session.participants() {
            if self.by_participant.get(participant).map(String::as_str) == Some(session_id) {
                self.by_participant.remove(participant);
            }
        }
        Some(entry)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.sessions.values().filter(|e| e.session.is_active()).count()
    }
}
