//! # ShadowCaster Indexer
//!
//! On-disk indexes mapping media file names to the directories that hold
//! them, plus the startup check that decides whether those indexes can be
//! trusted.
//!
//! ## Pipeline
//!
//! ```text
//! index_directory(root, kind)
//!     │
//!     ├──> Index file  <data_dir>/<tag>_<encoded root>.idx
//!     │
//!     ├──> Media Scanner (blocking thread)
//!     │      └─> accepted paths ──(single-slot channel)──┐
//!     │                                                  │
//!     └──> Index Builder (blocking thread) <─────────────┘
//!            └─> one write transaction, committed at end of input
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use shadowcaster_indexer::{check_all, IndexCoordinator, IndexerConfig, MediaIndexType};
//!
//! #[tokio::main]
//! async fn main() -> shadowcaster_indexer::Result<()> {
//!     check_all("/var/lib/shadowcaster")?;
//!
//!     let coordinator = IndexCoordinator::new(IndexerConfig::new("/var/lib/shadowcaster"));
//!     let task = coordinator
//!         .index_directory("/media/movies", MediaIndexType::Movie)
//!         .await?;
//!     let stats = task.wait().await?;
//!
//!     println!("Indexed {} files", stats.entries_written);
//!     Ok(())
//! }
//! ```

mod builder;
mod checker;
mod config;
mod coordinator;
mod error;
mod index_lock;
mod layout;
mod limits;
mod media;
mod scanner;
mod stats;
mod status;
mod store;

pub use builder::build;
pub use checker::check_all;
pub use config::{default_media_types, IndexerConfig};
pub use coordinator::{IndexCoordinator, IndexTask};
pub use error::{IndexerError, Result};
pub use index_lock::{InFlightRegistry, IndexWriteClaim};
pub use layout::{
    encode_root_dir, index_file_name, index_file_path, parse_index_file_name,
    INDEX_FILE_EXTENSION, PATHS_BUCKET,
};
pub use limits::{
    concurrent_runs_from_env, default_concurrent_runs, parse_concurrent_runs, RunLimitSnapshot,
    RunLimiter, CONCURRENCY_ENV, MAX_CONCURRENT_RUNS,
};
pub use media::{MediaIndexType, MOVIE_EXTENSIONS};
pub use scanner::{MediaScanner, Scan, ScanReport};
pub use stats::IndexStats;
pub use status::{RunRecord, RunState, StatusBoard};
pub use store::{Bucket, Entry, IndexStore, IndexTransaction, INDEX_FILE_MODE};
