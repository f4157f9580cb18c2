//! Canonical in-memory table of overflow records.
//!
//! Keyed by backup category id, which is what makes a backup category
//! belong to at most one record.

use crate::jsonl::{JsonlError, read_records_from_path, write_records_to_path};
use crate::record::OverflowRecord;
use crate::store::{RecordOrder, RecordQuery};
use spillway_kernel::CategoryId;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    records: BTreeMap<CategoryId, OverflowRecord>,
}

impl RecordTable {
    /// Build a table from records.
    ///
    /// Duplicate backup ids resolve with last-write-wins, matching append
    /// semantics of the JSONL file.
    pub fn from_records(records: Vec<OverflowRecord>) -> Self {
        let mut index = BTreeMap::new();
        for record in records {
            index.insert(record.backup_category_id, record);
        }
        Self { records: index }
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, JsonlError> {
        Ok(Self::from_records(read_records_from_path(path)?))
    }

    /// Persist in `(original, index)` order so the file diffs cleanly.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), JsonlError> {
        let records = self.select(&RecordQuery::All, RecordOrder::IndexAscending);
        write_records_to_path(path, &records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, backup: CategoryId) -> Option<&OverflowRecord> {
        self.records.get(&backup)
    }

    /// Insert or replace the record for its backup category.
    ///
    /// Returns the previous value if present.
    pub fn upsert(&mut self, record: OverflowRecord) -> Option<OverflowRecord> {
        self.records.insert(record.backup_category_id, record)
    }

    pub fn remove(&mut self, backup: CategoryId) -> Option<OverflowRecord> {
        self.records.remove(&backup)
    }

    /// Records matching `query`, grouped by original and sorted by index.
    pub fn select(&self, query: &RecordQuery, order: RecordOrder) -> Vec<OverflowRecord> {
        let mut selected: Vec<OverflowRecord> = self
            .records
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        selected.sort_by_key(|r| (r.original_category_id, r.index, r.backup_category_id));
        if order == RecordOrder::IndexDescending {
            selected.reverse();
        }
        selected
    }
}
