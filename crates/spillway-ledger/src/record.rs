//! Overflow record: one backup category linked to its original.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spillway_kernel::CategoryId;

/// Index of the first overflow category. The original is index 1 and has
/// no record.
pub const FIRST_OVERFLOW_INDEX: u32 = 2;

/// A backup category created because its original category was full.
///
/// At most one record exists per `backup_category_id`. Records sharing an
/// `original_category_id` are totally ordered by `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowRecord {
    pub original_category_id: CategoryId,
    pub backup_category_id: CategoryId,
    pub index: u32,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl OverflowRecord {
    pub fn new(original: CategoryId, backup: CategoryId, index: u32) -> Self {
        Self {
            original_category_id: original,
            backup_category_id: backup,
            index,
            created_at: Utc::now(),
        }
    }

    /// Index the next overflow of the same original would get.
    pub fn successor_index(&self) -> u32 {
        self.index.saturating_add(1)
    }
}
