use crate::limits::default_concurrent_runs;
use crate::MediaIndexType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings handed to [`crate::IndexCoordinator`] at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Directory holding every `*.idx` file
    pub data_dir: PathBuf,

    /// Media types the service accepts indexing requests for
    #[serde(default = "default_media_types")]
    pub media_types: Vec<MediaIndexType>,

    /// Upper bound on indexing runs executing at once
    #[serde(default = "default_concurrent_runs")]
    pub max_concurrent_runs: usize,
}

impl IndexerConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            media_types: default_media_types(),
            max_concurrent_runs: default_concurrent_runs(),
        }
    }

    #[must_use]
    pub fn with_media_types(mut self, media_types: Vec<MediaIndexType>) -> Self {
        self.media_types = media_types;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_runs(mut self, max_concurrent_runs: usize) -> Self {
        self.max_concurrent_runs = max_concurrent_runs;
        self
    }

    pub fn accepts(&self, kind: MediaIndexType) -> bool {
        self.media_types.contains(&kind)
    }
}

pub fn default_media_types() -> Vec<MediaIndexType> {
    vec![MediaIndexType::Movie]
}
