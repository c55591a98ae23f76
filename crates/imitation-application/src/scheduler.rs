//! Turn & Room Scheduler.
//!
//! Countdown tasks tick once per second. Each tick takes the state lock and
//! checks its own token first: a token cancelled while the tick was waiting
//! for the lock means the session moved on, and the tick is dropped.

use crate::arena::Arena;
use crate::registry::SessionEntry;
use imitation_core::protocol::ServerEvent;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const TICK: Duration = Duration::from_secs(1);

const ROOM_ENDED_MESSAGE: &str =
    "The conversation time has ended. You can now make your guess about your opponent.";
const FORFEIT_MESSAGE: &str = "You've lost your turn due to time running out.";

fn countdown_ticker() -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl Arena {
    /// Starts the overall conversation countdown for a new session.
    pub(crate) fn spawn_room_timer(&self, session_id: String, token: CancellationToken) {
        let arena = self.clone();
        let budget = self.config().timing.room_time_limit_secs;

        tokio::spawn(async move {
            let mut ticker = countdown_ticker();
            for elapsed in 1..=budget {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                if !arena.room_tick(&session_id, &token, budget - elapsed).await {
                    return;
                }
            }
        });
    }

    /// Returns false once the countdown should stop.
    async fn room_tick(&self, session_id: &str, token: &CancellationToken, time_left: u64) -> bool {
        let mut state = self.state().await;
        if token.is_cancelled() {
            return false;
        }
        let Some(entry) = state.registry.get_mut(session_id) else {
            return false;
        };
        if !entry.session.is_active() {
            return false;
        }

        for participant in entry.session.participants() {
            self.hub()
                .send(participant, ServerEvent::TimeUpdate { time_left });
        }
        if time_left > 0 {
            return true;
        }

        entry.session.deactivate();
        entry.timers.cancel_activity();
        tracing::info!(session_id, "Conversation time is up");
        for participant in entry.session.participants() {
            self.hub().send(
                participant,
                ServerEvent::ConversationEnded {
                    can_guess: true,
                    message: ROOM_ENDED_MESSAGE.to_string(),
                },
            );
        }

        let retention = self.config().timing.post_expiry_retention();
        self.schedule_purge(entry, retention);
        false
    }

    /// Starts a turn countdown for `owner`, replacing any running one.
    pub(crate) fn start_turn_timer(&self, entry: &mut SessionEntry, owner: &str) {
        let token = entry.timers.start_turn();
        let arena = self.clone();
        let session_id = entry.session.id.clone();
        let owner = owner.to_string();
        let budget = self.config().timing.turn_time_limit_secs;

        tokio::spawn(async move {
            let mut ticker = countdown_ticker();
            for elapsed in 1..=budget {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                if !arena
                    .turn_tick(&session_id, &owner, &token, budget - elapsed)
                    .await
                {
                    return;
                }
            }
        });
    }

    async fn turn_tick(
        &self,
        session_id: &str,
        owner: &str,
        token: &CancellationToken,
        time_left: u64,
    ) -> bool {
        let mut state = self.state().await;
        if token.is_cancelled() {
            return false;
        }
        let Some(entry) = state.registry.get_mut(session_id) else {
            return false;
        };
        if !entry.session.is_active() || !entry.session.holds_turn(owner) {
            return false;
        }

        let low_time = self.config().timing.low_time_threshold_secs;
        self.hub().send(
            owner,
            ServerEvent::TurnTimeUpdate {
                time_left,
                is_low_time: time_left <= low_time,
            },
        );
        if time_left > 0 {
            return true;
        }

        // The owner forfeits; nobody can send in this session any more.
        tracing::info!(session_id, participant_id = owner, "Turn time is up, forfeiting");
        self.hub().send(owner, ServerEvent::TurnTimeUp);
        self.hub().send(
            owner,
            ServerEvent::ForfeitResult {
                message: FORFEIT_MESSAGE.to_string(),
            },
        );
        if let Some(opponent) = entry.session.opponent_of(owner) {
            self.hub()
                .send(opponent, ServerEvent::OpponentForfeit { can_guess: true });
        }
        entry.session.conclude(owner);
        state.registry.remove(session_id);
        state.forfeit(session_id, owner);
        false
    }

    /// Removes the session after `delay`, replacing any earlier schedule.
    pub(crate) fn schedule_purge(&self, entry: &mut SessionEntry, delay: Duration) {
        let token = entry.timers.reschedule_purge();
        let arena = self.clone();
        let session_id = entry.session.id.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let mut state = arena.state().await;
            if token.is_cancelled() {
                return;
            }
            if state.registry.remove(&session_id).is_some() {
                tracing::info!(session_id = %session_id, "Session purged");
            }
        });
    }
}
