//! On-disk document shapes.

use imitation_core::conversation::{ConversationRecord, StoredMessage};
use serde::{Deserialize, Serialize};

pub const CONVERSATION_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    CONVERSATION_SCHEMA_VERSION
}

/// One conversation and its messages, stored as a single TOML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDocument {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub conversation: ConversationRecord,
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

impl ConversationDocument {
    pub fn new(conversation: ConversationRecord) -> Self {
        Self {
            schema_version: CONVERSATION_SCHEMA_VERSION,
            conversation,
            messages: Vec::new(),
        }
    }
}
