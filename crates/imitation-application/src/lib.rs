//! Application layer for the Imitation game server.
//!
//! `Arena` is the session engine: it pairs participants, runs the room and
//! turn countdowns, relays messages, drives the automated respondent and
//! resolves guesses. Collaborators (persistence, completion) are injected as
//! trait objects so the engine can be driven entirely in tests.

pub mod arena;
mod guess;
pub mod hub;
mod lifecycle;
mod matchmaker;
pub mod registry;
mod responder;
mod router;
mod scheduler;

pub use arena::{Arena, ArenaSnapshot};
pub use hub::ConnectionHub;
