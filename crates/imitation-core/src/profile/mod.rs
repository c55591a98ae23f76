//! Automation profile domain module.
//!
//! An automation profile selects the persona and prompt template the automated
//! respondent uses for one session.
//!
//! # Module Structure
//!
//! - `model`: The `AutomationProfile` entity
//! - `preset`: The built-in fallback profile and prompt template

mod model;
mod preset;

pub use model::AutomationProfile;
pub use preset::{DEFAULT_PROFILE_ID, DEFAULT_PROMPT_TEMPLATE, default_profile};
