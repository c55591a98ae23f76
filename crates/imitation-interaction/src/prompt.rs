//! Prompt assembly for the automated respondent.
//!
//! Builds a plain-text transcript from the session history, renders it into
//! the profile's template, and cleans template artifacts out of raw replies.

use imitation_core::error::{ArenaError, Result};
use imitation_core::profile::AutomationProfile;
use imitation_core::session::{AUTOMATION_PARTICIPANT_ID, SessionMessage};
use minijinja::{Environment, context};
use regex::Regex;
use std::sync::OnceLock;

const HUMAN_LABEL: &str = "Stranger";
const AUTOMATION_LABEL: &str = "You";

/// `{{ .. }}`, `{% .. %}`, `<|..|>` and `[your name]`-style leftovers.
fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        match Regex::new(r"(?s)\{\{.*?\}\}|\{%.*?%\}|<\|[^|>]*\|>|\[(?i:[a-z ]*name[a-z ]*)\]") {
            Ok(re) => re,
            Err(_) => unreachable!("static regex pattern is valid"),
        }
    })
}

/// A speaker label the model sometimes echoes from the transcript.
fn speaker_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"^(?i:you|me|assistant|ai|stranger)\s*:\s*") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"\s+") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

/// One line per message, labelled from the automated respondent's point of view.
pub fn build_transcript(messages: &[SessionMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let label = if m.sender_id == AUTOMATION_PARTICIPANT_ID {
                AUTOMATION_LABEL
            } else {
                HUMAN_LABEL
            };
            format!("{}: {}", label, m.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders `template` with `name`, `persona` and `transcript`.
pub fn render_prompt(template: &str, profile: &AutomationProfile, transcript: &str) -> Result<String> {
    let env = Environment::new();
    env.render_str(
        template,
        context! {
            name => profile.name.as_str(),
            persona => profile.persona.as_str(),
            transcript => transcript,
        },
    )
    .map_err(|err| ArenaError::completion(format!("Failed to render prompt template: {err}")))
}

/// Removes template artifacts and echoed speaker labels from a raw reply.
pub fn strip_placeholders(raw: &str) -> String {
    let without_tokens = placeholder_regex().replace_all(raw, " ");
    let collapsed = whitespace_regex().replace_all(without_tokens.trim(), " ");
    let unlabelled = speaker_label_regex().replace(collapsed.trim(), "");
    unlabelled
        .trim()
        .trim_matches('"')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use imitation_core::profile::{DEFAULT_PROMPT_TEMPLATE, default_profile};

    fn message(sender: &str, text: &str) -> SessionMessage {
        SessionMessage {
            text: text.to_string(),
            sender_id: sender.to_string(),
            sender_is_first: sender != AUTOMATION_PARTICIPANT_ID,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_transcript_labels_speakers() {
        let transcript = build_transcript(&[
            message("alice", "hey, where are you from? "),
            message(AUTOMATION_PARTICIPANT_ID, "Leeds, you?"),
        ]);
        assert_eq!(
            transcript,
            "Stranger: hey, where are you from?\nYou: Leeds, you?"
        );
    }

    #[test]
    fn test_render_default_template() {
        let profile = default_profile();
        let prompt = render_prompt(DEFAULT_PROMPT_TEMPLATE, &profile, "Stranger: hi").unwrap();
        assert!(prompt.contains("You are Alex"));
        assert!(prompt.contains("Stranger: hi"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_transcript_is_not_evaluated_as_template() {
        let profile = default_profile();
        let prompt = render_prompt("{{ transcript }}", &profile, "Stranger: {{ name }}").unwrap();
        assert_eq!(prompt, "Stranger: {{ name }}");
    }

    #[test]
    fn test_broken_template_is_a_completion_error() {
        let err = render_prompt("{% if %}", &default_profile(), "").unwrap_err();
        assert!(err.is_completion());
    }

    #[test]
    fn test_strip_placeholders() {
        assert_eq!(strip_placeholders("You: sure thing {{ name }}"), "sure thing");
        assert_eq!(strip_placeholders("\"haha   [Your Name] yes\""), "haha yes");
        assert_eq!(strip_placeholders("ok<|endoftext|>"), "ok");
        assert_eq!(strip_placeholders("plain reply"), "plain reply");
    }
}
