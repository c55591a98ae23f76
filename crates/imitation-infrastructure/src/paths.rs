//! Platform paths for the Imitation server.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/imitation/         # Config directory
//! └── config.toml              # Server configuration
//!
//! ~/.local/share/imitation/    # Data directory
//! └── conversations/           # One TOML document per conversation
//!     └── <session-id>.toml
//! ```

use imitation_core::error::{ArenaError, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "imitation";

pub struct ImitationPaths;

impl ImitationPaths {
    /// `<config_dir>/imitation`
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ArenaError::config("Cannot determine the platform config directory"))
    }

    /// `<data_dir>/imitation`
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| ArenaError::config("Cannot determine the platform data directory"))
    }

    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Conversation documents under `data_dir`, or the platform data directory.
    pub fn conversations_dir(data_dir: Option<&Path>) -> Result<PathBuf> {
        let base = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::data_dir()?,
        };
        Ok(base.join("conversations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversations_dir_honours_override() {
        let dir = ImitationPaths::conversations_dir(Some(Path::new("/srv/imitation"))).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/imitation/conversations"));
    }
}
