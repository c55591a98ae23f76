//! Conversation persistence domain module.
//!
//! # Module Structure
//!
//! - `record`: Persisted conversation, guess and message records
//! - `outcome`: The scored answer returned to a guesser
//! - `gateway`: The `PersistenceGateway` trait

mod gateway;
mod outcome;
mod record;

pub use gateway::PersistenceGateway;
pub use outcome::GuessOutcome;
pub use record::{
    ConversationRecord, CreatedConversation, GameStatistics, GuessRecord, NewConversation,
    StoredMessage,
};
