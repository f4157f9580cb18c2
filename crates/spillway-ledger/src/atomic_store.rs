//! Lock-scoped atomic mutation helpers for the JSONL ledger.

use crate::jsonl::JsonlError;
use crate::memory::RecordTable;
use chrono::Utc;
use std::error::Error as StdError;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn ledger_lock_path(ledger_path: &Path) -> PathBuf {
    let mut path: OsString = ledger_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

#[derive(Debug)]
pub enum AtomicLedgerError<E> {
    LockBusy { lock_path: String },
    LockIo { lock_path: String, message: String },
    Store(JsonlError),
    Mutation(E),
}

impl<E> AtomicLedgerError<E> {
    fn lock_busy(lock_path: &Path) -> Self {
        Self::LockBusy {
            lock_path: lock_path.display().to_string(),
        }
    }

    fn lock_io(lock_path: &Path, message: impl Into<String>) -> Self {
        Self::LockIo {
            lock_path: lock_path.display().to_string(),
            message: message.into(),
        }
    }
}

impl<E: Display> Display for AtomicLedgerError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockBusy { lock_path } => write!(f, "overflow ledger lock busy: {lock_path}"),
            Self::LockIo { lock_path, message } => {
                write!(
                    f,
                    "failed to acquire overflow ledger lock {lock_path}: {message}"
                )
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::Mutation(err) => write!(f, "{err}"),
        }
    }
}

impl<E> StdError for AtomicLedgerError<E> where
    E: Display + std::fmt::Debug + StdError + 'static
{
}

/// Execute one lock-scoped mutation against a ledger JSONL path.
///
/// The mutator returns `(value, changed)`; `changed=true` persists the
/// table before the lock is released.
pub fn mutate_ledger_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicLedgerError<E>>
where
    F: FnOnce(&mut RecordTable) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let _guard = LedgerFileLockGuard::acquire(path).map_err(|err| match err {
        AtomicLedgerError::LockBusy { lock_path } => AtomicLedgerError::LockBusy { lock_path },
        AtomicLedgerError::LockIo { lock_path, message } => {
            AtomicLedgerError::LockIo { lock_path, message }
        }
        AtomicLedgerError::Store(source) => AtomicLedgerError::Store(source),
        AtomicLedgerError::Mutation(unreachable) => match unreachable {},
    })?;

    let mut table = RecordTable::load_jsonl(path).map_err(AtomicLedgerError::Store)?;
    let (value, changed) = mutator(&mut table).map_err(AtomicLedgerError::Mutation)?;
    if changed {
        table.save_jsonl(path).map_err(AtomicLedgerError::Store)?;
    }
    Ok(value)
}

struct LedgerFileLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl LedgerFileLockGuard {
    fn acquire(path: &Path) -> Result<Self, AtomicLedgerError<std::convert::Infallible>> {
        let lock_path = ledger_lock_path(path);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| AtomicLedgerError::lock_io(&lock_path, e.to_string()))?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(
                    file,
                    "pid={}\nutc={}",
                    std::process::id(),
                    Utc::now().to_rfc3339()
                );
                Ok(Self {
                    lock_path,
                    _file: file,
                })
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AtomicLedgerError::lock_busy(&lock_path))
            }
            Err(err) => Err(AtomicLedgerError::lock_io(&lock_path, err.to_string())),
        }
    }
}

impl Drop for LedgerFileLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
