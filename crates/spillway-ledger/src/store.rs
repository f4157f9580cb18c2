//! Record store adapters.
//!
//! The ledger only needs atomic find/upsert/delete on small records, so
//! any document store fits behind [`RecordStore`]. Two adapters ship here:
//! a JSONL file with lock-scoped writes, and an in-process table.

use async_trait::async_trait;
use spillway_kernel::CategoryId;
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::atomic_store::{AtomicLedgerError, mutate_ledger_jsonl};
use crate::jsonl::JsonlError;
use crate::memory::RecordTable;
use crate::record::OverflowRecord;

/// Which records a lookup selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordQuery {
    All,
    /// Records overflowing from this original category.
    Original(CategoryId),
    /// The record owning this backup category.
    Backup(CategoryId),
}

impl RecordQuery {
    pub fn matches(&self, record: &OverflowRecord) -> bool {
        match self {
            Self::All => true,
            Self::Original(id) => record.original_category_id == *id,
            Self::Backup(id) => record.backup_category_id == *id,
        }
    }
}

/// Result ordering for [`RecordStore::find_all`]. Records are grouped by
/// original category either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrder {
    #[default]
    IndexAscending,
    IndexDescending,
}

/// Errors raised by a record store backend.
#[derive(Debug, thiserror::Error)]
pub enum LedgerStoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error(transparent)]
    Atomic(#[from] AtomicLedgerError<Infallible>),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Persistent store for overflow records.
///
/// Each call is atomic on its own; there is no cross-call transaction and
/// the last writer wins.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find(&self, query: RecordQuery) -> Result<Option<OverflowRecord>, LedgerStoreError>;

    async fn find_all(
        &self,
        query: RecordQuery,
        order: RecordOrder,
    ) -> Result<Vec<OverflowRecord>, LedgerStoreError>;

    /// Insert, or replace the record with the same backup category.
    async fn upsert(&self, record: OverflowRecord) -> Result<(), LedgerStoreError>;

    /// Delete the record for `record.backup_category_id`. Deleting a
    /// missing record is not an error.
    async fn delete(&self, record: &OverflowRecord) -> Result<(), LedgerStoreError>;
}

/// In-process record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    table: Mutex<RecordTable>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<OverflowRecord>) -> Self {
        Self {
            table: Mutex::new(RecordTable::from_records(records)),
        }
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut RecordTable) -> T) -> T {
        let mut table = self.table.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut table)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find(&self, query: RecordQuery) -> Result<Option<OverflowRecord>, LedgerStoreError> {
        Ok(self.with_table(|table| {
            table
                .select(&query, RecordOrder::IndexAscending)
                .into_iter()
                .next()
        }))
    }

    async fn find_all(
        &self,
        query: RecordQuery,
        order: RecordOrder,
    ) -> Result<Vec<OverflowRecord>, LedgerStoreError> {
        Ok(self.with_table(|table| table.select(&query, order)))
    }

    async fn upsert(&self, record: OverflowRecord) -> Result<(), LedgerStoreError> {
        self.with_table(|table| table.upsert(record));
        Ok(())
    }

    async fn delete(&self, record: &OverflowRecord) -> Result<(), LedgerStoreError> {
        self.with_table(|table| table.remove(record.backup_category_id));
        Ok(())
    }
}

/// Attempts at the `.lock` file before a write gives up with `LockBusy`.
const LOCK_ATTEMPTS: u32 = 20;
/// Backoff step between lock attempts; the wait grows linearly.
const LOCK_BACKOFF: Duration = Duration::from_millis(10);

/// One write gate per ledger path, shared by every store in the process.
fn write_gate(path: &Path) -> Arc<AsyncMutex<()>> {
    static GATES: OnceLock<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>> = OnceLock::new();
    let mut gates = GATES
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|p| p.into_inner());
    gates.entry(path.to_path_buf()).or_default().clone()
}

/// JSONL-file record store.
///
/// Reads load the whole file. Writes queue on a per-path async gate so
/// tasks in this process never contend for the `.lock` file, then go
/// through [`mutate_ledger_jsonl`]; a lock held by another process is
/// retried with a bounded backoff. File work runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct JsonlRecordStore {
    path: PathBuf,
    gate: Arc<AsyncMutex<()>>,
}

impl JsonlRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let gate = write_gate(&path);
        Self { path, gate }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, LedgerStoreError>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf) -> Result<T, LedgerStoreError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || f(path))
            .await
            .map_err(|e| LedgerStoreError::Unavailable(e.to_string()))?
    }

    /// Apply `mutator` under the write gate; it returns whether the table
    /// changed and must be saved.
    async fn write<F>(&self, mutator: F) -> Result<(), LedgerStoreError>
    where
        F: Fn(&mut RecordTable) -> bool + Send + 'static,
    {
        // The guard moves into the blocking task so a cancelled caller
        // cannot release the gate while the file is still being written.
        let gate = self.gate.clone().lock_owned().await;
        self.blocking(move |path| {
            let result = mutate_with_retry(&path, mutator);
            drop(gate);
            result
        })
        .await
    }
}

fn mutate_with_retry(
    path: &Path,
    mutator: impl Fn(&mut RecordTable) -> bool,
) -> Result<(), LedgerStoreError> {
    let mut attempt = 1;
    loop {
        match mutate_ledger_jsonl::<_, Infallible, _>(path, |table| Ok(((), mutator(table)))) {
            Err(AtomicLedgerError::LockBusy { lock_path }) if attempt < LOCK_ATTEMPTS => {
                debug!(lock = %lock_path, attempt, "overflow ledger lock busy, retrying");
                std::thread::sleep(LOCK_BACKOFF * attempt);
                attempt += 1;
            }
            result => return result.map_err(LedgerStoreError::from),
        }
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn find(&self, query: RecordQuery) -> Result<Option<OverflowRecord>, LedgerStoreError> {
        Ok(self
            .find_all(query, RecordOrder::IndexAscending)
            .await?
            .into_iter()
            .next())
    }

    async fn find_all(
        &self,
        query: RecordQuery,
        order: RecordOrder,
    ) -> Result<Vec<OverflowRecord>, LedgerStoreError> {
        self.blocking(move |path| {
            let table = RecordTable::load_jsonl(&path)?;
            Ok(table.select(&query, order))
        })
        .await
    }

    async fn upsert(&self, record: OverflowRecord) -> Result<(), LedgerStoreError> {
        debug!(
            ledger = %self.path.display(),
            backup = %record.backup_category_id,
            index = record.index,
            "upserting overflow record"
        );
        self.write(move |table| {
            table.upsert(record.clone());
            true
        })
        .await
    }

    async fn delete(&self, record: &OverflowRecord) -> Result<(), LedgerStoreError> {
        let backup = record.backup_category_id;
        self.write(move |table| table.remove(backup).is_some())
            .await
    }
}
