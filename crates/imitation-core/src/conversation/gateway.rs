//! Persistence Gateway trait.
//!
//! Defines the narrow query interface the engine uses to store conversations,
//! messages and guesses.

use super::record::{
    ConversationRecord, CreatedConversation, GameStatistics, NewConversation, StoredMessage,
};
use crate::error::Result;
use crate::profile::AutomationProfile;

/// An abstract store for conversation records.
///
/// Conversation identifiers are chosen by the store; lookups by session id
/// must keep working after the live session is gone.
///
/// # Implementation Notes
///
/// Implementations should handle:
/// - Concurrent calls from many sessions
/// - Keeping a guess immutable once written
#[async_trait::async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Creates the record for a new session.
    async fn create_conversation(&self, new: NewConversation) -> Result<CreatedConversation>;

    /// Stores a guess and its correctness, returning the full record.
    ///
    /// # Returns
    ///
    /// - `Ok(ConversationRecord)`: The record after the guess was applied
    /// - `Err(ArenaError::NotFound)`: No such conversation
    async fn submit_guess(
        &self,
        conversation_id: &str,
        participant_id: &str,
        guessed_is_automation: bool,
    ) -> Result<ConversationRecord>;

    /// Appends a message to a conversation.
    async fn create_message(
        &self,
        conversation_id: &str,
        is_first_participant: bool,
        text: &str,
        sender_id: &str,
    ) -> Result<StoredMessage>;

    /// Looks up the record created for `session_id`.
    async fn get_conversation_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationRecord>>;

    /// Picks a random profile from the catalog.
    ///
    /// Stores without a catalog keep the default, and the engine falls back
    /// to the built-in profile.
    async fn random_automation_profile(&self) -> Result<Option<AutomationProfile>> {
        Ok(None)
    }

    /// Looks up a catalog profile by id.
    async fn automation_profile(&self, _profile_id: &str) -> Result<Option<AutomationProfile>> {
        Ok(None)
    }

    /// The prompt template for `profile_id`, or the store's default template.
    async fn prompt_template(&self, profile_id: Option<&str>) -> Result<String>;

    /// Messages of a conversation, oldest first.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>>;

    /// Records involving `participant_id`, newest first.
    async fn conversations_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ConversationRecord>>;

    /// Totals across every stored conversation.
    async fn statistics(&self) -> Result<GameStatistics>;
}
