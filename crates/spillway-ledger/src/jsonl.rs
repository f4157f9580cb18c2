//! On-disk ledger format: one JSON overflow record per line.
//!
//! Blank lines and `#` comments are ignored when loading. Saving writes a
//! sibling temp file, syncs it, renames it over the ledger and then syncs
//! the directory so the rename itself survives a crash.

use crate::record::OverflowRecord;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Errors from loading or saving the JSONL ledger.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid overflow record: {message}")]
    Parse { line: usize, message: String },

    #[error("corrupted ledger {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: &'static str },
}

impl JsonlError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Load every record in the ledger file. A missing file reads as empty.
pub fn read_records_from_path(path: impl AsRef<Path>) -> Result<Vec<OverflowRecord>, JsonlError> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(JsonlError::io(path, err)),
    };
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt {
            path: path.to_path_buf(),
            reason: "contains NUL bytes",
        });
    }
    let text = std::str::from_utf8(&bytes).map_err(|_| JsonlError::Corrupt {
        path: path.to_path_buf(),
        reason: "not valid UTF-8",
    })?;
    parse_records(text)
}

fn parse_records(text: &str) -> Result<Vec<OverflowRecord>, JsonlError> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, body)| {
            serde_json::from_str(body).map_err(|e| JsonlError::Parse {
                line,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Replace the ledger file with `records`, one per line.
pub fn write_records_to_path(
    path: impl AsRef<Path>,
    records: &[OverflowRecord],
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| JsonlError::io(parent, e))?;

    let tmp_path = tmp_sibling(path);
    if let Err(err) = write_synced(&tmp_path, records) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(JsonlError::io(path, err));
    }
    sync_dir(parent)
}

fn write_synced(tmp_path: &Path, records: &[OverflowRecord]) -> Result<(), JsonlError> {
    let file = File::create(tmp_path).map_err(|e| JsonlError::io(tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)
            .map_err(|e| JsonlError::io(tmp_path, e.into()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| JsonlError::io(tmp_path, e))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| JsonlError::io(tmp_path, e.into_error()))?;
    file.sync_all().map_err(|e| JsonlError::io(tmp_path, e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), JsonlError> {
    File::open(dir)
        .and_then(|handle| handle.sync_all())
        .map_err(|e| JsonlError::io(dir, e))
}

// Directory handles cannot be synced on this platform.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), JsonlError> {
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".tmp.{}", std::process::id()));
    path.with_file_name(name)
}
