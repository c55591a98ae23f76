//! Error types for the Imitation game server.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole arena.
///
/// Every failure is scoped to a single session or a single operation; none of
/// these variants is fatal to the process.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum ArenaError {
    /// A session, conversation or participant that does not exist
    #[error("No such {entity_type}: '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The caller acted on a session it is not a member of, or on an inactive session
    #[error("Validation error: {0}")]
    Validation(String),

    /// A Persistence Gateway call failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The Completion Service failed or returned an unusable reply
    #[error("Completion service error: {message}")]
    Completion {
        status_code: Option<u16>,
        message: String,
    },

    /// Session creation failed during matchmaking
    #[error("Match creation error: {0}")]
    MatchCreation(String),

    /// Config file is missing required values or is inconsistent
    #[error("Invalid config: {0}")]
    Config(String),

    /// Filesystem failure in the TOML store or config loader
    #[error("I/O failure: {message}")]
    Io { message: String },

    /// A record or frame could not be encoded or decoded
    #[error("Failed to encode/decode {format}: {message}")]
    Serialization {
        format: String,
        message: String,
    },

    /// Broken invariant inside the arena
    #[error("Arena bug: {0}")]
    Internal(String),
}

impl ArenaError {
    // --- constructors ---

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// A Completion error without an HTTP status
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            status_code: None,
            message: message.into(),
        }
    }

    pub fn match_creation(message: impl Into<String>) -> Self {
        Self::MatchCreation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // --- predicates ---

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Completion { .. })
    }

    pub fn is_match_creation(&self) -> bool {
        matches!(self, Self::MatchCreation(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// A short message suitable for an `ERROR` notification to a participant.
    ///
    /// Internal details (paths, HTTP bodies) stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::NotFound { entity_type, .. } => format!("Unknown {}", entity_type),
            Self::Persistence(_) => "Failed to save your action, please try again".to_string(),
            Self::MatchCreation(_) => "Failed to join matchmaking".to_string(),
            Self::Completion { .. } => "Your opponent is having trouble responding".to_string(),
            _ => "Something went wrong".to_string(),
        }
    }
}

impl From<std::io::Error> for ArenaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{:?}: {}", err.kind(), err),
        }
    }
}

fn codec_error(format: &str, err: impl std::fmt::Display) -> ArenaError {
    ArenaError::Serialization {
        format: format.to_string(),
        message: err.to_string(),
    }
}

impl From<serde_json::Error> for ArenaError {
    fn from(err: serde_json::Error) -> Self {
        codec_error("json", err)
    }
}

impl From<toml::de::Error> for ArenaError {
    fn from(err: toml::de::Error) -> Self {
        codec_error("toml", err)
    }
}

impl From<toml::ser::Error> for ArenaError {
    fn from(err: toml::ser::Error) -> Self {
        codec_error("toml", err)
    }
}

pub type Result<T> = std::result::Result<T, ArenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_persistence_details() {
        let err = ArenaError::persistence("disk full at /var/lib/imitation/abc.toml");
        assert!(err.is_persistence());
        assert!(!err.client_message().contains("/var/lib"));
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = ArenaError::validation("Not your turn");
        assert!(err.is_validation());
        assert_eq!(err.client_message(), "Not your turn");
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ArenaError = io.into();
        assert!(err.to_string().contains("NotFound"));
    }
}
