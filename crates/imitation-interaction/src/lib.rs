//! Completion Service clients and prompt assembly for the automated respondent.

pub mod canned_completion;
pub mod http_completion;
pub mod prompt;

pub use canned_completion::CannedCompletionService;
pub use http_completion::HttpCompletionClient;

use imitation_core::config::{CompletionBackend, CompletionConfig};
use imitation_core::completion::CompletionService;
use imitation_core::error::Result;
use std::sync::Arc;

/// Builds the Completion Service selected by `config.backend`.
pub fn completion_service_from_config(config: &CompletionConfig) -> Result<Arc<dyn CompletionService>> {
    match config.backend {
        CompletionBackend::Http => Ok(Arc::new(HttpCompletionClient::from_config(config)?)),
        CompletionBackend::Canned => Ok(Arc::new(CannedCompletionService::default())),
    }
}
