//! TOML-based Persistence Gateway.
//!
//! Stores each conversation as `<root_dir>/<conversation_id>.toml`, holding the
//! record and its `[[messages]]`. The conversation id is the session id, so
//! lookups by session id are a single file read.
//!
//! # Features
//!
//! - **Atomic writes**: tmp file + fsync + rename via [`AtomicTomlFile`]
//! - **Locked updates**: guesses and messages are read-modify-write under a file lock
//! - **Async-safe**: all file work runs in `tokio::task::spawn_blocking`

use crate::dto::ConversationDocument;
use crate::profile_catalog::ProfileCatalog;
use crate::storage::{AtomicTomlError, AtomicTomlFile};
use async_trait::async_trait;
use chrono::Utc;
use imitation_core::conversation::{
    ConversationRecord, CreatedConversation, GameStatistics, NewConversation, PersistenceGateway,
    StoredMessage,
};
use imitation_core::error::{ArenaError, Result};
use imitation_core::profile::AutomationProfile;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task;

pub struct TomlConversationStore {
    /// Directory holding one document per conversation
    root_dir: PathBuf,
    catalog: ProfileCatalog,
}

impl TomlConversationStore {
    pub fn new(root_dir: PathBuf, catalog: ProfileCatalog) -> Self {
        Self { root_dir, catalog }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn document(&self, conversation_id: &str) -> Result<AtomicTomlFile<ConversationDocument>> {
        validate_id(conversation_id)?;
        Ok(AtomicTomlFile::new(
            self.root_dir.join(format!("{}.toml", conversation_id)),
        ))
    }

    fn load_all_sync(root_dir: &Path) -> Result<Vec<ConversationDocument>> {
        if !root_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(root_dir).map_err(|e| {
            ArenaError::persistence(format!(
                "Failed to read conversation directory {}: {}",
                root_dir.display(),
                e
            ))
        })?;

        let mut documents = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }

            match AtomicTomlFile::<ConversationDocument>::new(path.clone()).load() {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), "Skipping corrupt conversation: {}", e),
            }
        }
        Ok(documents)
    }

    async fn all_documents(&self) -> Result<Vec<ConversationDocument>> {
        let root_dir = self.root_dir.clone();
        task::spawn_blocking(move || Self::load_all_sync(&root_dir))
            .await
            .map_err(join_error)?
    }
}

/// Conversation ids become file names; only a safe character set is accepted.
fn validate_id(conversation_id: &str) -> Result<()> {
    let valid = !conversation_id.is_empty()
        && conversation_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ArenaError::validation(format!(
            "Invalid conversation id '{}'",
            conversation_id
        )));
    }
    Ok(())
}

fn join_error(e: task::JoinError) -> ArenaError {
    ArenaError::internal(format!("Failed to spawn blocking task: {}", e))
}

fn storage_error(conversation_id: &str, err: AtomicTomlError) -> ArenaError {
    match err {
        AtomicTomlError::Missing(_) => ArenaError::not_found("conversation", conversation_id),
        AtomicTomlError::Rejected(message) => ArenaError::validation(message),
        other => ArenaError::persistence(format!("conversation {}: {}", conversation_id, other)),
    }
}

#[async_trait]
impl PersistenceGateway for TomlConversationStore {
    async fn create_conversation(&self, new: NewConversation) -> Result<CreatedConversation> {
        let conversation_id = new.session_id.clone();
        let file = self.document(&conversation_id)?;
        let created_at = Utc::now();
        let document =
            ConversationDocument::new(ConversationRecord::new(conversation_id.clone(), new, created_at));

        let id = conversation_id.clone();
        task::spawn_blocking(move || file.create(&document))
            .await
            .map_err(join_error)?
            .map_err(|e| storage_error(&id, e))?;

        tracing::debug!(conversation_id = %conversation_id, "Created conversation document");
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
        let file = self.document(conversation_id)?;
        let participant_id = participant_id.to_string();

        task::spawn_blocking(move || {
            file.modify(|document| {
                document
                    .conversation
                    .apply_guess(&participant_id, guessed_is_automation)
                    .map_err(|e| AtomicTomlError::Rejected(e.to_string()))?;
                Ok(document.conversation.clone())
            })
        })
        .await
        .map_err(join_error)?
        .map_err(|e| storage_error(conversation_id, e))
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        is_first_participant: bool,
        text: &str,
        sender_id: &str,
    ) -> Result<StoredMessage> {
        let file = self.document(conversation_id)?;
        let message = StoredMessage {
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_is_first: is_first_participant,
            text: text.to_string(),
            sent_at: Utc::now(),
        };

        let stored = message.clone();
        task::spawn_blocking(move || {
            file.modify(|document| {
                document.messages.push(stored);
                Ok(())
            })
        })
        .await
        .map_err(join_error)?
        .map_err(|e| storage_error(conversation_id, e))?;

        Ok(message)
    }

    async fn get_conversation_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<ConversationRecord>> {
        let file = self.document(session_id)?;
        let document = task::spawn_blocking(move || file.load())
            .await
            .map_err(join_error)?
            .map_err(|e| storage_error(session_id, e))?;
        Ok(document.map(|d| d.conversation))
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
        let file = self.document(conversation_id)?;
        let document = task::spawn_blocking(move || file.load())
            .await
            .map_err(join_error)?
            .map_err(|e| storage_error(conversation_id, e))?
            .ok_or_else(|| ArenaError::not_found("conversation", conversation_id))?;

        let mut messages = document.messages;
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        Ok(messages)
    }

    async fn conversations_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ConversationRecord>> {
        let mut records: Vec<ConversationRecord> = self
            .all_documents()
            .await?
            .into_iter()
            .map(|d| d.conversation)
            .filter(|r| r.involves(participant_id))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn statistics(&self) -> Result<GameStatistics> {
        let documents = self.all_documents().await?;
        Ok(GameStatistics::from_records(
            documents.iter().map(|d| &d.conversation),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id_rejects_path_segments() {
        assert!(validate_id("0b7c3c1e-9a1d-4c55-8d7e-1f0e2a3b4c5d").is_ok());
        assert!(validate_id("../etc/passwd").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("").is_err());
    }

    #[test]
    fn test_storage_error_mapping() {
        let missing = storage_error("c1", AtomicTomlError::Missing(PathBuf::from("c1.toml")));
        assert!(missing.is_not_found());

        let rejected = storage_error("c1", AtomicTomlError::Rejected("outsider".to_string()));
        assert!(rejected.is_validation());

        let lock = storage_error("c1", AtomicTomlError::Lock("busy".to_string()));
        assert!(lock.is_persistence());
    }
}
