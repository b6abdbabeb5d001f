//! Configuration loader for Kindred.
//!
//! Reads `config.toml` from the data directory (`~/.kindred/` by default)
//! into [`MemoryConfig`]. A missing or malformed file falls back to the
//! defaults; values are clamped into range before use.

use std::path::{Path, PathBuf};

use kindred_types::config::MemoryConfig;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "KINDRED_DATA_DIR";

/// Resolve the data directory: `KINDRED_DATA_DIR`, else `~/.kindred`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kindred")
}

/// Load configuration from `{data_dir}/config.toml`.
pub async fn load_config(data_dir: &Path) -> MemoryConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return MemoryConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return MemoryConfig::default();
        }
    };

    match toml::from_str::<MemoryConfig>(&content) {
        Ok(config) => config.validated(),
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            MemoryConfig::default()
        }
    }
}
