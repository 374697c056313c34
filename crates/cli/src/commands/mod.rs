//! Subcommand implementations and the wiring they share.

pub mod ask;
pub mod chat;
pub mod context;
pub mod doctor;
pub mod init;
pub mod intents;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shopbot_config::AppConfig;
use shopbot_core::Message;
use shopbot_pipeline::{ChatPipeline, PipelineDeps};
use shopbot_store::RecordStore;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_from(&config_path(path)).map_err(|e| format!("Failed to load config: {e}").into())
}

pub fn open_records(config: &AppConfig) -> Result<Arc<RecordStore>, Box<dyn std::error::Error>> {
    let store = RecordStore::open(&config.records.path)
        .map_err(|e| format!("Failed to open records at {}: {e}", config.records.path.display()))?;
    Ok(Arc::new(store))
}

/// Build the full pipeline from config, failing early on missing credentials.
pub fn build_pipeline(config: &AppConfig) -> Result<ChatPipeline, Box<dyn std::error::Error>> {
    config.require_credentials()?;
    let collaborators = shopbot_providers::build_from_config(config)?;
    let deps = PipelineDeps {
        generator: collaborators.generator,
        embedder: collaborators.embedder,
        index: collaborators.index,
        records: open_records(config)?,
    };
    Ok(ChatPipeline::new(deps, config))
}

/// Read a JSON array of `{role, content, timestamp?}` messages.
pub fn read_history(path: Option<&Path>) -> Result<Vec<Message>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read history {}: {e}", path.display()))?;
    let history = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid history file {}: {e}", path.display()))?;
    Ok(history)
}
