use crate::{IndexStats, IndexerError, MediaIndexType};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Succeeded,
    Failed,
}

/// Latest run recorded for one index file.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub index_path: PathBuf,
    pub kind: MediaIndexType,
    pub root: PathBuf,
    pub state: RunState,
    pub started_unix_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_per_sec: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<IndexStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// In-memory view of the most recent run per index file, so callers that
/// fired a run and moved on can still see how it ended.
#[derive(Clone, Default)]
pub struct StatusBoard {
    runs: Arc<Mutex<HashMap<PathBuf, RunRecord>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start(&self, index_path: &Path, kind: MediaIndexType, root: &Path) {
        let record = RunRecord {
            index_path: index_path.to_path_buf(),
            kind,
            root: root.to_path_buf(),
            state: RunState::Running,
            started_unix_ms: current_unix_ms(),
            duration_ms: None,
            files_per_sec: None,
            stats: None,
            error: None,
        };
        self.lock().insert(index_path.to_path_buf(), record);
    }

    pub(crate) fn finish(
        &self,
        index_path: &Path,
        duration_ms: u64,
        outcome: std::result::Result<&IndexStats, &IndexerError>,
    ) {
        let mut runs = self.lock();
        let Some(record) = runs.get_mut(index_path) else {
            return;
        };
        record.duration_ms = Some(duration_ms);
        match outcome {
            Ok(stats) => {
                record.state = RunState::Succeeded;
                record.files_per_sec = stats.files_per_sec();
                record.stats = Some(stats.clone());
                record.error = None;
            }
            Err(err) => {
                record.state = RunState::Failed;
                record.error = Some(err.to_string());
            }
        }
    }

    pub fn get(&self, index_path: &Path) -> Option<RunRecord> {
        self.lock().get(index_path).cloned()
    }

    /// Records ordered by index path, optionally limited to one media type.
    pub fn snapshot(&self, kind: Option<MediaIndexType>) -> Vec<RunRecord> {
        let mut records: Vec<RunRecord> = self
            .lock()
            .values()
            .filter(|record| kind.map_or(true, |kind| record.kind == kind))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.index_path.cmp(&b.index_path));
        records
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, RunRecord>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|dur| u64::try_from(dur.as_millis()).ok())
        .unwrap_or(0)
}
