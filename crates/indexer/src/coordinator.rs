use crate::builder::build;
use crate::index_lock::{InFlightRegistry, IndexWriteClaim};
use crate::layout::{index_file_path, PATHS_BUCKET};
use crate::limits::{RunLimitSnapshot, RunLimiter};
use crate::scanner::{absolute_root, MediaScanner};
use crate::status::StatusBoard;
use crate::store::IndexStore;
use crate::{IndexStats, IndexerConfig, IndexerError, MediaIndexType, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

/// Entry point for indexing requests: validates them, opens the index file
/// and launches the scan/build pipeline as its own task.
#[derive(Clone)]
pub struct IndexCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: IndexerConfig,
    registry: InFlightRegistry,
    limiter: RunLimiter,
    status: StatusBoard,
}

impl IndexCoordinator {
    pub fn new(config: IndexerConfig) -> Self {
        let limiter = RunLimiter::new(config.max_concurrent_runs);
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                registry: InFlightRegistry::new(),
                limiter,
                status: StatusBoard::new(),
            }),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.inner.config
    }

    pub fn status(&self) -> &StatusBoard {
        &self.inner.status
    }

    pub fn run_limits(&self) -> RunLimitSnapshot {
        self.inner.limiter.snapshot()
    }

    /// Index file that `root` maps to for `kind`.
    pub fn index_path(&self, root: &Path, kind: MediaIndexType) -> Result<PathBuf> {
        let root = absolute_root(root)?;
        Ok(index_file_path(&self.inner.config.data_dir, kind, &root))
    }

    /// Start indexing `root` as `kind`.
    ///
    /// Returns once the request is validated and its index file is open; the
    /// walk and the write transaction continue on a spawned task. The returned
    /// handle can be awaited or dropped.
    pub async fn index_directory(
        &self,
        root: impl AsRef<Path>,
        kind: MediaIndexType,
    ) -> Result<IndexTask> {
        let extensions = self.scanner_extensions(kind)?;
        let root = absolute_root(root.as_ref())?;
        let index_path = index_file_path(&self.inner.config.data_dir, kind, &root);

        let claim = self.inner.registry.claim(&index_path).map_err(|err| {
            log::warn!("{err}");
            err
        })?;

        let open_path = index_path.clone();
        let store = tokio::task::spawn_blocking(move || IndexStore::open_or_create(open_path))
            .await
            .map_err(join_error)?
            .map_err(|err| {
                log::error!("{err}");
                err
            })?;

        log::info!("Indexing {} into {}", root.display(), index_path.display());
        self.inner.status.start(&index_path, kind, &root);

        let run = IndexRun {
            root,
            kind,
            extensions,
            store,
            claim,
            limiter: self.inner.limiter.clone(),
            status: self.inner.status.clone(),
        };
        let handle = tokio::spawn(run.execute());

        Ok(IndexTask {
            index_path,
            kind,
            handle,
        })
    }

    fn scanner_extensions(&self, kind: MediaIndexType) -> Result<&'static [&'static str]> {
        if !self.inner.config.accepts(kind) {
            log::warn!("Unsupported index type {kind}: not enabled");
            return Err(IndexerError::UnsupportedType(kind.to_string()));
        }
        kind.accepted_extensions().ok_or_else(|| {
            log::warn!("Unsupported index type {kind}: no scanner registered");
            IndexerError::UnsupportedType(kind.to_string())
        })
    }
}

/// Handle to a running indexing job.
pub struct IndexTask {
    index_path: PathBuf,
    kind: MediaIndexType,
    handle: JoinHandle<Result<IndexStats>>,
}

impl IndexTask {
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn kind(&self) -> MediaIndexType {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end and return its outcome.
    pub async fn wait(self) -> Result<IndexStats> {
        self.handle.await.map_err(join_error)?
    }
}

struct IndexRun {
    root: PathBuf,
    kind: MediaIndexType,
    extensions: &'static [&'static str],
    store: IndexStore,
    claim: IndexWriteClaim,
    limiter: RunLimiter,
    status: StatusBoard,
}

impl IndexRun {
    async fn execute(self) -> Result<IndexStats> {
        let IndexRun {
            root,
            kind,
            extensions,
            store,
            claim,
            limiter,
            status,
        } = self;
        let index_path = claim.path().to_path_buf();

        let start = Instant::now();
        let result = {
            let _permit = limiter.acquire().await;
            run_pipeline(&root, extensions, store).await
        };
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let result = result.map(|mut stats| {
            stats.time_ms = duration_ms;
            stats
        });

        match &result {
            Ok(stats) => log::info!(
                "Finished indexing {} ({kind}): {} entries, {} unsupported files skipped, {} ms",
                root.display(),
                stats.entries_written,
                stats.scan.unsupported,
                duration_ms
            ),
            Err(err) => log::error!("Indexing {} ({kind}) failed: {err}", root.display()),
        }
        status.finish(&index_path, duration_ms, result.as_ref());

        drop(claim);
        result
    }
}

/// Scanner on one blocking thread, builder on another, joined by a
/// single-slot channel. The store is closed once the builder is done.
async fn run_pipeline(
    root: &Path,
    extensions: &'static [&'static str],
    store: IndexStore,
) -> Result<IndexStats> {
    let (tx, mut rx) = mpsc::channel::<PathBuf>(1);

    let scanner = MediaScanner::new(root, extensions);
    let producer = tokio::task::spawn_blocking(move || scanner.feed(tx));
    let consumer = tokio::task::spawn_blocking(move || {
        let written = build(
            &store,
            PATHS_BUCKET,
            std::iter::from_fn(|| rx.blocking_recv()),
        );
        store.close();
        written
    });

    let (scan, written) = tokio::join!(producer, consumer);
    let written = written.map_err(join_error)??;
    let scan = scan.map_err(join_error)?;

    if let Some(reason) = scan.root_error.clone() {
        return Err(IndexerError::Scan {
            root: root.to_path_buf(),
            reason,
        });
    }

    let mut stats = IndexStats::new();
    stats.entries_written = written;
    stats.scan = scan;
    Ok(stats)
}

fn join_error(err: JoinError) -> IndexerError {
    IndexerError::Other(format!("join index task: {err}"))
}
