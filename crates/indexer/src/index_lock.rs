use crate::{IndexerError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Index files that currently have a writer in this process.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `path` for writing. Fails with [`IndexerError::IndexBusy`] while
    /// another claim on the same path is alive.
    pub fn claim(&self, path: &Path) -> Result<IndexWriteClaim> {
        if !self.lock().insert(path.to_path_buf()) {
            return Err(IndexerError::IndexBusy(path.to_path_buf()));
        }
        Ok(IndexWriteClaim {
            paths: Arc::clone(&self.paths),
            path: path.to_path_buf(),
        })
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to write one index file; released on drop.
pub struct IndexWriteClaim {
    paths: Arc<Mutex<HashSet<PathBuf>>>,
    path: PathBuf,
}

impl IndexWriteClaim {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IndexWriteClaim {
    fn drop(&mut self) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}
