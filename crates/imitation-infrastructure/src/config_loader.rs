//! Loads `ArenaConfig` from disk.

use crate::paths::ImitationPaths;
use imitation_core::config::ArenaConfig;
use imitation_core::error::{ArenaError, Result};
use std::fs;
use std::path::Path;

/// Reads the config from `path`, or from the platform config file.
///
/// An explicit path must exist. A missing default file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ArenaConfig> {
    match path {
        Some(path) => read_config(path),
        None => {
            let default_path = ImitationPaths::default_config_file()?;
            if default_path.exists() {
                read_config(&default_path)
            } else {
                tracing::info!(
                    path = %default_path.display(),
                    "No config file found, using defaults"
                );
                Ok(ArenaConfig::default())
            }
        }
    }
}

fn read_config(path: &Path) -> Result<ArenaConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        ArenaError::config(format!("Failed to read config {}: {}", path.display(), e))
    })?;
    let config = ArenaConfig::from_toml_str(&content)?;
    tracing::info!(path = %path.display(), profiles = config.profiles.len(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_config(Some(&temp_dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_reads_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[server]\nbind = \"127.0.0.1:9000\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[matchmaking]\nautomation_probability = -1.0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
