//! Domain model for the Imitation game server.
//!
//! Holds the session state machine, the wire protocol, configuration types
//! and the traits of the two external collaborators (`PersistenceGateway`,
//! `CompletionService`). Nothing in this crate performs I/O.

pub mod completion;
pub mod config;
pub mod conversation;
pub mod error;
pub mod profile;
pub mod protocol;
pub mod session;

// Re-export common error type
pub use error::{ArenaError, Result};
