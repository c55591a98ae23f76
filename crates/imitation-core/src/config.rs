//! Arena configuration.
//!
//! Every field carries a default so an empty (or missing) config file yields a
//! playable server. Durations are stored as plain integers in the file and
//! exposed as [`Duration`] through accessor methods.

use crate::error::{ArenaError, Result};
use crate::profile::AutomationProfile;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Overall conversation budget: 2 minutes.
pub const ROOM_TIME_LIMIT: Duration = Duration::from_secs(120);
/// Per-turn response budget: 30 seconds.
pub const TURN_TIME_LIMIT: Duration = Duration::from_secs(30);

/// Root of the configuration file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ArenaConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Automation profile catalog
    #[serde(default, rename = "profile")]
    pub profiles: Vec<AutomationProfile>,
}

impl ArenaConfig {
    /// Parses a config document from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ArenaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects budgets and ranges that would make the game unplayable.
    pub fn validate(&self) -> Result<()> {
        let timing = &self.timing;
        if timing.room_time_limit_secs == 0 {
            return Err(ArenaError::config("timing.room_time_limit_secs must be positive"));
        }
        if timing.turn_time_limit_secs == 0 {
            return Err(ArenaError::config("timing.turn_time_limit_secs must be positive"));
        }
        if timing.low_time_threshold_secs > timing.turn_time_limit_secs {
            return Err(ArenaError::config(
                "timing.low_time_threshold_secs cannot exceed the turn budget",
            ));
        }

        let p = self.matchmaking.automation_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ArenaError::config(format!(
                "matchmaking.automation_probability must be within [0, 1], got {}",
                p
            )));
        }

        self.responder.typing_start_delay_ms.validate("responder.typing_start_delay_ms")?;
        self.responder.composing_duration_ms.validate("responder.composing_duration_ms")?;
        self.responder.turn_return_delay_ms.validate("responder.turn_return_delay_ms")?;

        let mut seen = std::collections::HashSet::new();
        for profile in &self.profiles {
            if profile.id.trim().is_empty() {
                return Err(ArenaError::config("profile.id cannot be empty"));
            }
            if !seen.insert(profile.id.as_str()) {
                return Err(ArenaError::config(format!("duplicate profile id '{}'", profile.id)));
            }
        }

        Ok(())
    }
}

/// Countdown budgets and teardown windows.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Overall conversation budget
    pub room_time_limit_secs: u64,
    /// Per-turn response budget
    pub turn_time_limit_secs: u64,
    /// Turn ticks at or below this many seconds carry the "low time" flag
    pub low_time_threshold_secs: u64,
    /// How long an expired room stays around for late guesses
    pub post_expiry_retention_secs: u64,
    /// Delay between deactivation and removal, so in-flight notifications land
    pub teardown_grace_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            room_time_limit_secs: ROOM_TIME_LIMIT.as_secs(),
            turn_time_limit_secs: TURN_TIME_LIMIT.as_secs(),
            low_time_threshold_secs: 5,
            post_expiry_retention_secs: 15 * 60,
            teardown_grace_secs: 5,
        }
    }
}

impl TimingConfig {
    pub fn room_time_limit(&self) -> Duration {
        Duration::from_secs(self.room_time_limit_secs)
    }

    pub fn turn_time_limit(&self) -> Duration {
        Duration::from_secs(self.turn_time_limit_secs)
    }

    pub fn post_expiry_retention(&self) -> Duration {
        Duration::from_secs(self.post_expiry_retention_secs)
    }

    pub fn teardown_grace(&self) -> Duration {
        Duration::from_secs(self.teardown_grace_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Probability that a join is paired with the automated respondent
    pub automation_probability: f64,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            automation_probability: 0.5,
        }
    }
}

/// An inclusive millisecond range a random delay is drawn from.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn as_range(&self) -> RangeInclusive<u64> {
        self.min_ms..=self.max_ms
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(ArenaError::config(format!(
                "{}: min_ms ({}) exceeds max_ms ({})",
                field, self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Human-like pacing of the automated respondent.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ResponderConfig {
    /// Idle → typing-started
    pub typing_start_delay_ms: DelayRange,
    /// Minimum time spent composing (the completion call runs inside it)
    pub composing_duration_ms: DelayRange,
    /// Reply-sent → turn-returned
    pub turn_return_delay_ms: DelayRange,
    /// Sent when the Completion Service fails
    pub fallback_reply: String,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            typing_start_delay_ms: DelayRange::new(500, 2000),
            composing_duration_ms: DelayRange::new(2000, 5000),
            turn_return_delay_ms: DelayRange::new(500, 1500),
            fallback_reply: "Sorry, I got distracted for a second. What were you saying?"
                .to_string(),
        }
    }
}

/// Which Completion Service backs the automated respondent.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBackend {
    /// OpenAI-compatible chat completions over HTTP
    Http,
    /// Offline canned replies
    #[default]
    Canned,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CompletionConfig {
    pub backend: CompletionBackend,
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            backend: CompletionBackend::default(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 20,
            max_tokens: Some(120),
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// One TOML document per conversation under `data_dir`
    #[default]
    Toml,
    /// Process-local, lost on restart
    Memory,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Defaults to the platform data directory when unset
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Enables daily-rotated log files in addition to stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = ArenaConfig::from_toml_str("").unwrap();
        assert_eq!(config.timing.room_time_limit(), ROOM_TIME_LIMIT);
        assert_eq!(config.timing.turn_time_limit(), TURN_TIME_LIMIT);
        assert_eq!(config.matchmaking.automation_probability, 0.5);
        assert_eq!(config.completion.backend, CompletionBackend::Canned);
        assert_eq!(config.storage.backend, StorageBackend::Toml);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_partial_sections_and_profiles() {
        let content = r#"
            [timing]
            turn_time_limit_secs = 45

            [responder]
            typing_start_delay_ms = { min_ms = 10, max_ms = 20 }

            [[profile]]
            id = "barista"
            name = "Sam"
            persona = "A barista from Leeds who loves football"
        "#;

        let config = ArenaConfig::from_toml_str(content).unwrap();
        assert_eq!(config.timing.turn_time_limit_secs, 45);
        assert_eq!(config.timing.room_time_limit_secs, 120);
        assert_eq!(config.responder.typing_start_delay_ms, DelayRange::new(10, 20));
        assert_eq!(config.responder.composing_duration_ms, DelayRange::new(2000, 5000));
        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.profiles[0].id, "barista");
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let err = ArenaConfig::from_toml_str("[matchmaking]\nautomation_probability = 1.5\n")
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejects_inverted_delay_range() {
        let err = ArenaConfig::from_toml_str(
            "[responder]\nturn_return_delay_ms = { min_ms = 900, max_ms = 100 }\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("turn_return_delay_ms"));
    }

    #[test]
    fn test_rejects_zero_turn_budget() {
        let err = ArenaConfig::from_toml_str("[timing]\nturn_time_limit_secs = 0\nlow_time_threshold_secs = 0\n")
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejects_duplicate_profiles() {
        let content = r#"
            [[profile]]
            id = "a"
            name = "A"

            [[profile]]
            id = "a"
            name = "B"
        "#;
        assert!(ArenaConfig::from_toml_str(content).is_err());
    }
}
