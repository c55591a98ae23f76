//! Persistence Gateway implementations, configuration loading and platform paths.

pub mod config_loader;
pub mod dto;
pub mod memory_conversation_store;
pub mod paths;
pub mod profile_catalog;
pub mod storage;
pub mod toml_conversation_store;

pub use config_loader::load_config;
pub use memory_conversation_store::InMemoryConversationStore;
pub use paths::ImitationPaths;
pub use profile_catalog::ProfileCatalog;
pub use toml_conversation_store::TomlConversationStore;

use imitation_core::config::{StorageBackend, StorageConfig};
use imitation_core::conversation::PersistenceGateway;
use imitation_core::error::Result;
use std::sync::Arc;

/// Builds the Persistence Gateway selected by `storage.backend`.
pub fn conversation_store_from_config(
    storage: &StorageConfig,
    catalog: ProfileCatalog,
) -> Result<Arc<dyn PersistenceGateway>> {
    match storage.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryConversationStore::new(catalog))),
        StorageBackend::Toml => {
            let root_dir = ImitationPaths::conversations_dir(storage.data_dir.as_deref())?;
            tracing::info!(dir = %root_dir.display(), "Storing conversations as TOML");
            Ok(Arc::new(TomlConversationStore::new(root_dir, catalog)))
        }
    }
}
