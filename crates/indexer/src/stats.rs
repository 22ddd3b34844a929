use crate::ScanReport;
use serde::Serialize;

/// Statistics about one indexing run
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    /// Entries written to the `paths` bucket
    pub entries_written: usize,

    /// What the directory walk saw
    pub scan: ScanReport,

    /// Time taken in milliseconds
    pub time_ms: u64,
}

impl IndexStats {
    pub fn new() -> Self {
        Self {
            entries_written: 0,
            scan: ScanReport::default(),
            time_ms: 0,
        }
    }

    pub fn files_per_sec(&self) -> Option<f32> {
        if self.time_ms == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.entries_written as f32 / (self.time_ms as f32 / 1000.0))
    }
}

impl Default for IndexStats {
    fn default() -> Self {
        Self::new()
    }
}
