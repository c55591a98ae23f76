//! In-memory Persistence Gateway.
//!
//! Everything is lost on restart. Used with `[storage] backend = "memory"`
//! and by tests.

use crate::dto::ConversationDocument;
use crate::profile_catalog::ProfileCatalog;
use async_trait::async_trait;
use chrono::Utc;
use imitation_core::conversation::{
    ConversationRecord, CreatedConversation, GameStatistics, NewConversation, PersistenceGateway,
    StoredMessage,
};
use imitation_core::error::{ArenaError, Result};
use imitation_core::profile::AutomationProfile;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryConversationStore {
    documents: RwLock<HashMap<String, ConversationDocument>>,
    catalog: ProfileCatalog,
}

impl InMemoryConversationStore {
    pub fn new(catalog: ProfileCatalog) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            catalog,
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryConversationStore {
    async fn create_conversation(&self, new: NewConversation) -> Result<CreatedConversation> {
        let conversation_id = new.session_id.clone();
        let created_at = Utc::now();

        let mut documents = self.documents.write().await;
        if documents.contains_key(&conversation_id) {
            return Err(ArenaError::persistence(format!(
                "Conversation {} already exists",
                conversation_id
            )));
        }
        documents.insert(
            conversation_id.clone(),
            ConversationDocument::new(ConversationRecord::new(conversation_id.clone(), new, created_at)),
        );

        Ok(CreatedConversation {
            conversation_id,
            created_at,
        })
    }

    async fn submit_guess(
        &self,
        conversation_id: &str,
        participant_id: &str,
        guessed_is_automation: bool,
    ) -> Result<ConversationRecord> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(conversation_id)
            .ok_or_else(|| ArenaError::not_found("conversation", conversation_id))?;
        document
            .conversation
            .apply_guess(participant_id, guessed_is_automation)?;
        Ok(document.conversation.clone())
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        is_first_participant: bool,
        text: &str,
        sender_id: &str,
    ) -> Result<StoredMessage> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(conversation_id)
            .ok_or_else(|| ArenaError::not_found("conversation", conversation_id))?;

        let message = StoredMessage {
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_is_first: is_first_participant,
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        document.messages.push(message.clone());
        Ok(message)
    }

    async fn get_conversation_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationRecord>> {
        let documents = self.documents.read().await;
        Ok(documents
            .values()
            .find(|d| d.conversation.session_id == session_id)
            .map(|d| d.conversation.clone()))
    }

    async fn random_automation_profile(&self) -> Result<Option<AutomationProfile>> {
        Ok(self.catalog.random())
    }

    async fn automation_profile(&self, profile_id: &str) -> Result<Option<AutomationProfile>> {
        Ok(self.catalog.get(profile_id))
    }

    async fn prompt_template(&self, profile_id: Option<&str>) -> Result<String> {
        Ok(self.catalog.template_for(profile_id))
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let documents = self.documents.read().await;
        let document = documents
            .get(conversation_id)
            .ok_or_else(|| ArenaError::not_found("conversation", conversation_id))?;
        Ok(document.messages.clone())
    }

    async fn conversations_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ConversationRecord>> {
        let documents = self.documents.read().await;
        let mut records: Vec<ConversationRecord> = documents
            .values()
            .map(|d| &d.conversation)
            .filter(|r| r.involves(participant_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn statistics(&self) -> Result<GameStatistics> {
        let documents = self.documents.read().await;
        Ok(GameStatistics::from_records(
            documents.values().map(|d| &d.conversation),
        ))
    }
}
