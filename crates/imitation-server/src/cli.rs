use clap::{Parser, ValueEnum};
use imitation_core::config::{ArenaConfig, CompletionBackend, StorageBackend};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "imitation")]
#[command(about = "Imitation - human or machine? A realtime conversation game server", long_about = None)]
pub struct Args {
    /// Config file (defaults to <config dir>/imitation/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Where conversations are stored
    #[arg(long, value_enum)]
    pub storage: Option<StorageArg>,

    /// Directory for the TOML conversation store
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Completion backend for the automated respondent
    #[arg(long, value_enum)]
    pub completion: Option<CompletionArg>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Also write daily-rotated log files here
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageArg {
    Toml,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CompletionArg {
    Http,
    Canned,
}

impl Args {
    /// Applies command-line overrides on top of the loaded config.
    pub fn apply_to(&self, config: &mut ArenaConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(storage) = self.storage {
            config.storage.backend = match storage {
                StorageArg::Toml => StorageBackend::Toml,
                StorageArg::Memory => StorageBackend::Memory,
            };
        }
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = Some(data_dir.clone());
        }
        if let Some(completion) = self.completion {
            config.completion.backend = match completion {
                CompletionArg::Http => CompletionBackend::Http,
                CompletionArg::Canned => CompletionBackend::Canned,
            };
        }
        if let Some(log_dir) = &self.log_dir {
            config.server.log_dir = Some(log_dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_config_untouched() {
        let args = Args::try_parse_from(["imitation"]).unwrap();
        let mut config = ArenaConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config, ArenaConfig::default());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_overrides_are_applied() {
        let args = Args::try_parse_from([
            "imitation",
            "--bind",
            "127.0.0.1:9000",
            "--storage",
            "memory",
            "--completion",
            "http",
        ])
        .unwrap();
        let mut config = ArenaConfig::default();
        args.apply_to(&mut config);

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.completion.backend, CompletionBackend::Http);
    }

    #[test]
    fn test_unknown_storage_is_rejected() {
        assert!(Args::try_parse_from(["imitation", "--storage", "redis"]).is_err());
    }
}
