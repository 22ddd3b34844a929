use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shadowcaster_indexer::{
    concurrent_runs_from_env, default_concurrent_runs, default_media_types, IndexerConfig,
    MediaIndexType,
};
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_DOCROOT: &str = "www";
pub const DEFAULT_DATA_DIR: &str = "shadowcaster.d";

/// Server settings: built-in defaults, then the optional TOML file, then
/// command-line flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub docroot: PathBuf,
    pub data_dir: PathBuf,
    pub media_types: Vec<MediaIndexType>,
    pub max_concurrent_runs: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            docroot: PathBuf::from(DEFAULT_DOCROOT),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            media_types: default_media_types(),
            max_concurrent_runs: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn ensure_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Cannot create data dir {}", self.data_dir.display()))
    }

    pub fn indexer_config(&self) -> IndexerConfig {
        let max_concurrent_runs = self
            .max_concurrent_runs
            .unwrap_or_else(|| concurrent_runs_from_env(default_concurrent_runs()));
        IndexerConfig::new(&self.data_dir)
            .with_media_types(self.media_types.clone())
            .with_max_concurrent_runs(max_concurrent_runs)
    }
}
