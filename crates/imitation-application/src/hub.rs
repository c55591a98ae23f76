//! Outbound event delivery to connected participants.

use imitation_core::error::{ArenaError, Result};
use imitation_core::protocol::ServerEvent;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Maps participant ids to their outbound channels.
///
/// Sending never blocks and never fails loudly: an unknown or closed
/// participant is skipped.
#[derive(Default)]
pub struct ConnectionHub {
    senders: Mutex<HashMap<String, UnboundedSender<ServerEvent>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn senders(&self) -> MutexGuard<'_, HashMap<String, UnboundedSender<ServerEvent>>> {
        self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a participant and returns the receiving end of its channel.
    pub fn connect(&self, participant_id: &str) -> Result<UnboundedReceiver<ServerEvent>> {
        let mut senders = self.senders();
        if senders.get(participant_id).is_some_and(|tx| !tx.is_closed()) {
            return Err(ArenaError::validation(format!(
                "Participant '{}' is already connected",
                participant_id
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        senders.insert(participant_id.to_string(), tx);
        Ok(rx)
    }

    pub fn disconnect(&self, participant_id: &str) -> bool {
        self.senders().remove(participant_id).is_some()
    }

    pub fn is_connected(&self, participant_id: &str) -> bool {
        self.senders()
            .get(participant_id)
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Delivers `event`. Returns whether a live channel accepted it.
    pub fn send(&self, participant_id: &str, event: ServerEvent) -> bool {
        let senders = self.senders();
        let Some(tx) = senders.get(participant_id) else {
            tracing::trace!(participant_id, event = event.name(), "Dropping event for unknown participant");
            return false;
        };
        if event.is_tick() {
            tracing::trace!(participant_id, event = event.name(), "Sending");
        } else {
            tracing::debug!(participant_id, event = event.name(), "Sending");
        }
        tx.send(event).is_ok()
    }

    pub fn len(&self) -> usize {
        self.senders().len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_connected_participant() {
        let hub = ConnectionHub::new();
        let mut rx = hub.connect("alice").unwrap();

        assert!(hub.send("alice", ServerEvent::TurnTimeUp));
        assert_eq!(rx.recv().await, Some(ServerEvent::TurnTimeUp));
    }

    #[test]
    fn test_send_to_unknown_is_noop() {
        let hub = ConnectionHub::new();
        assert!(!hub.send("ghost", ServerEvent::TurnTimeUp));
    }

    #[test]
    fn test_duplicate_connect_is_rejected_while_open() {
        let hub = ConnectionHub::new();
        let _rx = hub.connect("alice").unwrap();
        assert!(hub.connect("alice").unwrap_err().is_validation());
    }

    #[test]
    fn test_reconnect_after_receiver_dropped() {
        let hub = ConnectionHub::new();
        drop(hub.connect("alice").unwrap());
        assert!(!hub.is_connected("alice"));
        assert!(hub.connect("alice").is_ok());
    }

    #[test]
    fn test_disconnect_removes_channel() {
        let hub = ConnectionHub::new();
        let _rx = hub.connect("alice").unwrap();
        assert!(hub.disconnect("alice"));
        assert!(!hub.disconnect("alice"));
        assert!(hub.is_empty());
    }
}
