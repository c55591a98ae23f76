//! Matchmaking queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// The pairing a join request was assigned by the coin flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingKind {
    HumanSeekingHuman,
    HumanSeekingAutomation,
}

/// A participant waiting to be paired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingEntry {
    pub participant_id: String,
    pub kind: PairingKind,
    pub enqueued_at: DateTime<Utc>,
}

impl WaitingEntry {
    pub fn new(participant_id: impl Into<String>, kind: PairingKind) -> Self {
        Self {
            participant_id: participant_id.into(),
            kind,
            enqueued_at: Utc::now(),
        }
    }
}

/// FIFO of waiting participants; the front has waited longest.
#[derive(Debug, Default)]
pub struct WaitingQueue {
    entries: VecDeque<WaitingEntry>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.entries.iter().any(|e| e.participant_id == participant_id)
    }

    pub fn push_back(&mut self, entry: WaitingEntry) {
        self.entries.push_back(entry);
    }

    /// Returns an entry to the head of the queue, keeping its seniority.
    pub fn push_front(&mut self, entry: WaitingEntry) {
        self.entries.push_front(entry);
    }

    /// Removes `participant_id`. Returns whether it was queued.
    pub fn remove(&mut self, participant_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.participant_id != participant_id);
        before != self.entries.len()
    }

    /// Takes the two longest-waiting entries seeking a human, oldest first.
    pub fn take_pair(&mut self) -> Option<(WaitingEntry, WaitingEntry)> {
        let mut positions = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.kind == PairingKind::HumanSeekingHuman)
            .map(|(i, _)| i);
        let first = positions.next()?;
        let second = positions.next()?;

        // Remove the later index first so the earlier one stays valid.
        let b = self.entries.remove(second)?;
        let a = self.entries.remove(first)?;
        Some((a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_pair_needs_two_human_seekers() {
        let mut queue = WaitingQueue::new();
        queue.push_back(WaitingEntry::new("a", PairingKind::HumanSeekingHuman));
        assert!(queue.take_pair().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_take_pair_returns_longest_waiting() {
        let mut queue = WaitingQueue::new();
        queue.push_back(WaitingEntry::new("a", PairingKind::HumanSeekingHuman));
        queue.push_back(WaitingEntry::new("x", PairingKind::HumanSeekingAutomation));
        queue.push_back(WaitingEntry::new("b", PairingKind::HumanSeekingHuman));
        queue.push_back(WaitingEntry::new("c", PairingKind::HumanSeekingHuman));

        let (first, second) = queue.take_pair().unwrap();
        assert_eq!(first.participant_id, "a");
        assert_eq!(second.participant_id, "b");
        assert!(queue.contains("x"));
        assert!(queue.contains("c"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut queue = WaitingQueue::new();
        queue.push_back(WaitingEntry::new("a", PairingKind::HumanSeekingHuman));
        assert!(queue.remove("a"));
        assert!(!queue.remove("a"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_front_restores_seniority() {
        let mut queue = WaitingQueue::new();
        queue.push_back(WaitingEntry::new("late", PairingKind::HumanSeekingHuman));
        queue.push_front(WaitingEntry::new("early", PairingKind::HumanSeekingHuman));
        let (first, _) = queue.take_pair().unwrap();
        assert_eq!(first.participant_id, "early");
    }
}
