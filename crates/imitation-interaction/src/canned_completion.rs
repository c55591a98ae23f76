//! Offline Completion Service that answers from a fixed list.

use async_trait::async_trait;
use imitation_core::completion::{CompletionRequest, CompletionResponse, CompletionService};
use imitation_core::error::{ArenaError, Result};
use rand::seq::SliceRandom;

const DEFAULT_REPLIES: &[&str] = &[
    "That's an interesting point!",
    "I see what you mean.",
    "Could you elaborate on that?",
    "I'm not sure I understand completely.",
    "That's a good question!",
    "Let me think about that...",
    "I have a different perspective on this.",
    "That's a fascinating observation.",
    "I agree with you on that.",
    "I'm not sure I agree with that point.",
];

/// Picks a random short reply; ignores the prompt.
#[derive(Debug, Clone)]
pub struct CannedCompletionService {
    replies: Vec<String>,
}

impl CannedCompletionService {
    pub fn new(replies: Vec<String>) -> Self {
        Self { replies }
    }
}

impl Default for CannedCompletionService {
    fn default() -> Self {
        Self::new(DEFAULT_REPLIES.iter().map(|r| r.to_string()).collect())
    }
}

#[async_trait]
impl CompletionService for CannedCompletionService {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        let reply = self
            .replies
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| ArenaError::completion("No canned replies configured"))?;
        Ok(CompletionResponse { reply })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reply_comes_from_list() {
        let service = CannedCompletionService::default();
        let response = service.complete(CompletionRequest::new("hi")).await.unwrap();
        assert!(DEFAULT_REPLIES.contains(&response.reply.as_str()));
    }

    #[tokio::test]
    async fn test_empty_list_is_a_completion_error() {
        let service = CannedCompletionService::new(Vec::new());
        let err = service.complete(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(err.is_completion());
    }
}
