//! Automated Responder.
//!
//! Drives one automated reply through
//! idle → typing-started → composing → reply-sent → turn-returned.
//! Every step re-checks that the session is still active, the respondent
//! still owns the turn and this run has not been superseded.

use crate::arena::Arena;
use crate::registry::{SessionEntry, SessionRegistry};
use chrono::Utc;
use imitation_core::completion::CompletionRequest;
use imitation_core::config::DelayRange;
use imitation_core::profile::{AutomationProfile, DEFAULT_PROMPT_TEMPLATE, default_profile};
use imitation_core::protocol::ServerEvent;
use imitation_core::session::{AUTOMATION_PARTICIPANT_ID, ResponderState, SessionMessage};
use imitation_interaction::prompt::{build_transcript, render_prompt, strip_placeholders};
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn random_delay(range: &DelayRange) -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(range.as_range()))
}

/// What the composing step produced.
enum Reply {
    Generated(String),
    Fallback,
}

impl Arena {
    pub(crate) fn spawn_responder(
        &self,
        session_id: String,
        human_id: String,
        token: CancellationToken,
    ) {
        let arena = self.clone();
        tokio::spawn(async move {
            if arena.run_responder(&session_id, &human_id, &token).await.is_none() {
                tracing::debug!(session_id = %session_id, "Automated reply abandoned");
            }
        });
    }

    /// Returns `None` as soon as the run is no longer wanted.
    async fn run_responder(
        &self,
        session_id: &str,
        human_id: &str,
        token: &CancellationToken,
    ) -> Option<()> {
        let pacing = &self.config().responder;

        // idle → typing-started
        sleep_or_cancel(random_delay(&pacing.typing_start_delay_ms), token).await?;
        let (messages, profile_id) = {
            let mut state = self.state().await;
            let entry = responder_entry(&mut state.registry, session_id, token)?;
            entry.session.responder_state = ResponderState::TypingStarted;
            self.hub()
                .send(human_id, ServerEvent::OpponentTyping { is_typing: true });
            (
                entry.session.messages.clone(),
                entry.session.automation_profile_id.clone(),
            )
        };

        // typing-started → composing
        let deadline = Instant::now() + random_delay(&pacing.composing_duration_ms);
        {
            let mut state = self.state().await;
            let entry = responder_entry(&mut state.registry, session_id, token)?;
            entry.session.responder_state = ResponderState::Composing;
        }
        let prompt = self.build_prompt(profile_id.as_deref(), &messages).await;
        let reply = tokio::select! {
            _ = token.cancelled() => return None,
            result = self.completion().complete(CompletionRequest::new(prompt)) => match result {
                Ok(response) => {
                    let cleaned = strip_placeholders(&response.reply);
                    if cleaned.is_empty() {
                        tracing::warn!(session_id, "Completion reply was empty after cleanup");
                        Reply::Fallback
                    } else {
                        Reply::Generated(cleaned)
                    }
                }
                Err(err) => {
                    tracing::warn!(session_id, error = %err, "Completion failed, sending fallback reply");
                    Reply::Fallback
                }
            },
        };
        tokio::select! {
            _ = token.cancelled() => return None,
            _ = tokio::time::sleep_until(deadline) => {}
        }

        // composing → reply-sent
        match reply {
            Reply::Generated(text) => self.deliver_reply(session_id, human_id, token, text).await?,
            Reply::Fallback => {
                let mut state = self.state().await;
                let entry = responder_entry(&mut state.registry, session_id, token)?;
                self.hub()
                    .send(human_id, ServerEvent::OpponentTyping { is_typing: false });
                self.hub().send(
                    human_id,
                    ServerEvent::ReceiveMessage {
                        text: pacing.fallback_reply.clone(),
                        timestamp: Utc::now(),
                        is_self: false,
                    },
                );
                entry.session.responder_state = ResponderState::ReplySent;
            }
        }

        // reply-sent → turn-returned
        sleep_or_cancel(random_delay(&pacing.turn_return_delay_ms), token).await?;
        let mut state = self.state().await;
        let entry = responder_entry(&mut state.registry, session_id, token)?;
        entry.session.pass_turn(human_id).ok()?;
        entry.session.responder_state = ResponderState::TurnReturned;
        self.start_turn_timer(entry, human_id);
        self.hub().send(
            human_id,
            ServerEvent::YourTurn {
                can_send_message: true,
                time_left: self.config().timing.turn_time_limit_secs,
            },
        );
        tracing::debug!(session_id, "Turn returned to human");
        Some(())
    }

    async fn deliver_reply(
        &self,
        session_id: &str,
        human_id: &str,
        token: &CancellationToken,
        text: String,
    ) -> Option<()> {
        let conversation_id = {
            let mut state = self.state().await;
            responder_entry(&mut state.registry, session_id, token)?
                .session
                .conversation_id
                .clone()
        };

        if let Err(err) = self
            .gateway()
            .create_message(&conversation_id, false, &text, AUTOMATION_PARTICIPANT_ID)
            .await
        {
            tracing::warn!(session_id, error = %err, "Failed to persist automated reply");
        }

        let mut state = self.state().await;
        let entry = responder_entry(&mut state.registry, session_id, token)?;
        let timestamp = Utc::now();
        entry
            .session
            .record_message(AUTOMATION_PARTICIPANT_ID, text.as_str(), timestamp);
        self.hub()
            .send(human_id, ServerEvent::OpponentTyping { is_typing: false });
        self.hub().send(
            human_id,
            ServerEvent::ReceiveMessage {
                text,
                timestamp,
                is_self: false,
            },
        );
        entry.session.responder_state = ResponderState::ReplySent;
        Some(())
    }

    /// Renders the prompt for the session's profile, degrading to the
    /// built-in profile and template.
    async fn build_prompt(&self, profile_id: Option<&str>, messages: &[SessionMessage]) -> String {
        let profile = match profile_id {
            Some(id) => match self.gateway().automation_profile(id).await {
                Ok(Some(profile)) => profile,
                Ok(None) => default_profile(),
                Err(err) => {
                    tracing::warn!(profile_id = id, error = %err, "Profile lookup failed");
                    default_profile()
                }
            },
            None => default_profile(),
        };
        let template = match self.gateway().prompt_template(profile_id).await {
            Ok(template) => template,
            Err(err) => {
                tracing::warn!(error = %err, "Prompt template lookup failed, using default");
                DEFAULT_PROMPT_TEMPLATE.to_string()
            }
        };

        let transcript = build_transcript(messages);
        render_prompt(&template, &profile, &transcript)
            .or_else(|err| {
                tracing::warn!(profile_id = %profile.id, error = %err, "Prompt template failed to render");
                render_prompt(DEFAULT_PROMPT_TEMPLATE, &profile, &transcript)
            })
            .unwrap_or_else(|_| fallback_prompt(&profile, &transcript))
    }
}

fn fallback_prompt(profile: &AutomationProfile, transcript: &str) -> String {
    format!(
        "You are {}, chatting with a stranger. Reply briefly.\n\n{}",
        profile.name, transcript
    )
}

/// The session entry, if the responder run behind `token` may still act on it.
fn responder_entry<'a>(
    registry: &'a mut SessionRegistry,
    session_id: &str,
    token: &CancellationToken,
) -> Option<&'a mut SessionEntry> {
    if token.is_cancelled() {
        return None;
    }
    registry
        .get_mut(session_id)
        .filter(|e| e.session.is_active() && e.session.holds_turn(AUTOMATION_PARTICIPANT_ID))
}

async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> Option<()> {
    tokio::select! {
        _ = token.cancelled() => None,
        _ = tokio::time::sleep(delay) => Some(()),
    }
}
