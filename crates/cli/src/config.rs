//! CLI configuration utilities

use anyhow::{Context, Result};
use logistics_frontend_common::{ClientConfig, ClientSet, FileStore, TokenStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Name of the session file inside the data directory
const SESSION_FILE: &str = "session.json";

/// Name of the optional config file inside the data directory
const CONFIG_FILE: &str = "config.toml";

/// Explicit directory, else `LOGISTICS_STATE_DIR`, else the platform data dir
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        if let Ok(state_dir) = std::env::var("LOGISTICS_STATE_DIR") {
            PathBuf::from(state_dir)
        } else {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("logistics")
        }
    })
}

/// Load client configuration, falling back to `<data_dir>/config.toml`
pub fn load_client_config(explicit: Option<&Path>, data_dir: &Path) -> Result<ClientConfig> {
    let default_path = data_dir.join(CONFIG_FILE);
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_path.exists().then_some(default_path),
    };

    if let Some(path) = &path {
        info!("Loading configuration from: {}", path.display());
    }

    ClientConfig::load(path.as_deref()).context("Failed to load configuration")
}

/// Wire every service around a session persisted in the data directory
pub fn build_clients(config: &ClientConfig, data_dir: &Path) -> Result<ClientSet> {
    let store = FileStore::new(data_dir.join(SESSION_FILE));
    let tokens = TokenStore::new(Arc::new(store));
    ClientSet::new(config, tokens).context("Failed to initialize API clients")
}
