use crate::{IndexerError, Result};
use redb::{Database, ReadableTable, TableDefinition, TableHandle};
use serde::Serialize;
use std::any::Any;
use std::fs::OpenOptions;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Permission bits for newly created index files (before umask).
pub const INDEX_FILE_MODE: u32 = 0o644;

type BytesTable<'a> = TableDefinition<'a, &'static [u8], &'static [u8]>;

fn bytes_table(name: &str) -> BytesTable<'_> {
    TableDefinition::new(name)
}

/// One `filename -> directory` mapping read back from a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub filename: String,
    pub directory: String,
}

/// Single-file transactional key-value index.
///
/// The underlying file handle and its lock are released by [`IndexStore::close`]
/// or, on early exits, when the store is dropped.
pub struct IndexStore {
    db: Database,
    path: PathBuf,
    // Backing file for stores opened by `open_for_check`; dropped after `db`.
    _snapshot: Option<NamedTempFile>,
}

impl IndexStore {
    /// Open an existing index file or initialise a new one.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = create_options()
            .open(&path)
            .map_err(|err| store_open_error(&path, err))?;
        let db = guard_damaged(&path, || {
            redb::Builder::new()
                .create_file(file)
                .map_err(|err| store_open_error(&path, err))
        })?;
        log::debug!("Opened index {}", path.display());
        Ok(Self {
            db,
            path,
            _snapshot: None,
        })
    }

    /// Open a private copy of an existing index file; never creates one.
    ///
    /// Opening and checking may rewrite the file they work on, so the copy
    /// absorbs those writes and the index at `path` is left byte-for-byte
    /// untouched. Errors still name `path`.
    pub fn open_for_check(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = NamedTempFile::new().map_err(|err| store_open_error(&path, err))?;
        std::fs::copy(&path, snapshot.path()).map_err(|err| store_open_error(&path, err))?;
        let db = guard_damaged(&path, || {
            Database::open(snapshot.path()).map_err(|err| store_open_error(&path, err))
        })?;
        Ok(Self {
            db,
            path,
            _snapshot: Some(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Walk the file's page graph, free list and table trees.
    ///
    /// Any inconsistency is reported as [`IndexerError::Corruption`], including
    /// ones the database was able to patch up while checking.
    pub fn check(&mut self) -> Result<()> {
        let path = self.path.clone();
        let db = &mut self.db;
        guard_damaged(&path, || match db.check_integrity() {
            Ok(true) => Ok(()),
            Ok(false) => Err(IndexerError::Corruption {
                path: path.clone(),
                detail: "inconsistent pages found".to_string(),
            }),
            Err(err) => Err(IndexerError::Corruption {
                path: path.clone(),
                detail: err.to_string(),
            }),
        })
    }

    pub fn begin_write(&self) -> Result<IndexTransaction> {
        let txn = self.db.begin_write()?;
        Ok(IndexTransaction { txn })
    }

    /// Committed contents of `bucket` in key order; empty when the bucket was
    /// never created.
    pub fn entries(&self, bucket: &str) -> Result<Vec<Entry>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(bytes_table(bucket)) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for item in table.iter()? {
            let (key, value) = item?;
            entries.push(Entry {
                filename: String::from_utf8_lossy(key.value()).into_owned(),
                directory: String::from_utf8_lossy(value.value()).into_owned(),
            });
        }
        Ok(entries)
    }

    pub fn close(self) {
        log::debug!("Closing index {}", self.path.display());
        drop(self.db);
    }
}

/// Write transaction over an [`IndexStore`]. Dropping it without
/// [`IndexTransaction::commit`] discards every staged write.
pub struct IndexTransaction {
    txn: redb::WriteTransaction,
}

impl IndexTransaction {
    /// Open the bucket `name`. Returns `None` when it does not exist and
    /// `create_if_missing` is false.
    pub fn bucket(&self, name: &str, create_if_missing: bool) -> Result<Option<Bucket<'_>>> {
        if !create_if_missing && !self.has_bucket(name)? {
            return Ok(None);
        }
        let table = self.txn.open_table(bytes_table(name))?;
        Ok(Some(Bucket { table }))
    }

    fn has_bucket(&self, name: &str) -> Result<bool> {
        Ok(self
            .txn
            .list_tables()?
            .any(|handle| handle.name() == name))
    }

    pub fn commit(self) -> Result<()> {
        self.txn
            .commit()
            .map_err(|err| IndexerError::Commit(err.to_string()))
    }

    pub fn abort(self) -> Result<()> {
        self.txn.abort()?;
        Ok(())
    }
}

/// Sorted byte-string mapping inside a transaction.
pub struct Bucket<'txn> {
    table: redb::Table<'txn, &'static [u8], &'static [u8]>,
}

impl Bucket<'_> {
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.table.insert(key, value)?;
        Ok(())
    }
}

fn create_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(INDEX_FILE_MODE);
    }
    options
}

/// Run `op`, turning a panic raised on a damaged file (truncated, or with
/// bytes past the recorded layout) into [`IndexerError::Corruption`].
fn guard_damaged<T>(path: &Path, op: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|payload| {
        Err(IndexerError::Corruption {
            path: path.to_path_buf(),
            detail: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "index file layout is damaged".to_string()
    }
}

fn store_open_error(path: &Path, err: impl std::fmt::Display) -> IndexerError {
    IndexerError::StoreOpen {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
