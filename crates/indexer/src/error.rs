use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store error: {0}")]
    StoreError(#[from] redb::Error),

    #[error("Cannot open index {}: {reason}", path.display())]
    StoreOpen { path: PathBuf, reason: String },

    #[error("Index {} failed consistency check: {detail}", path.display())]
    Corruption { path: PathBuf, detail: String },

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Unsupported index type {0}")]
    UnsupportedType(String),

    #[error("Scan of {} failed: {reason}", root.display())]
    Scan { root: PathBuf, reason: String },

    #[error("Index {} is already being written", .0.display())]
    IndexBusy(PathBuf),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Stable machine-readable code for logs and HTTP envelopes.
    pub const fn code(&self) -> &'static str {
        match self {
            IndexerError::IoError(_) => "io",
            IndexerError::StoreError(_) => "store",
            IndexerError::StoreOpen { .. } => "store_open",
            IndexerError::Corruption { .. } => "corruption",
            IndexerError::Commit(_) => "commit",
            IndexerError::UnsupportedType(_) => "unsupported_type",
            IndexerError::Scan { .. } => "scan",
            IndexerError::IndexBusy(_) => "index_busy",
            IndexerError::Other(_) => "other",
        }
    }
}

impl From<redb::StorageError> for IndexerError {
    fn from(err: redb::StorageError) -> Self {
        IndexerError::StoreError(err.into())
    }
}

impl From<redb::TableError> for IndexerError {
    fn from(err: redb::TableError) -> Self {
        IndexerError::StoreError(err.into())
    }
}

impl From<redb::TransactionError> for IndexerError {
    fn from(err: redb::TransactionError) -> Self {
        IndexerError::StoreError(err.into())
    }
}
