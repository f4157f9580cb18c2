//! Overflow ledger: original category → ordered backup categories.
//!
//! The ledger is a side table. It can drift from the live topology when a
//! backup category is removed by hand or a write is lost after the
//! platform call succeeded; [`OverflowLedger::reconcile`] repairs that on
//! request and is never run implicitly.

use spillway_kernel::CategoryId;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::record::{FIRST_OVERFLOW_INDEX, OverflowRecord};
use crate::store::{LedgerStoreError, RecordOrder, RecordQuery, RecordStore};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] LedgerStoreError),

    #[error(
        "overflow index {index} for category {original} does not follow current maximum {current}"
    )]
    IndexNotIncreasing {
        original: CategoryId,
        index: u32,
        current: u32,
    },

    #[error("category {backup} already backs category {original}")]
    BackupAlreadyTracked {
        backup: CategoryId,
        original: CategoryId,
    },
}

/// Typed access to overflow records over any [`RecordStore`].
#[derive(Clone)]
pub struct OverflowLedger {
    store: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for OverflowLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverflowLedger").finish_non_exhaustive()
    }
}

impl OverflowLedger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Overflows of `original` in ascending index order.
    pub async fn overflows_of(
        &self,
        original: CategoryId,
    ) -> Result<Vec<OverflowRecord>, LedgerError> {
        Ok(self
            .store
            .find_all(RecordQuery::Original(original), RecordOrder::IndexAscending)
            .await?)
    }

    /// Index the next overflow of `original` must take: one past the
    /// current maximum, or [`FIRST_OVERFLOW_INDEX`] when there is none.
    pub async fn next_index(&self, original: CategoryId) -> Result<u32, LedgerError> {
        let newest = self
            .store
            .find_all(RecordQuery::Original(original), RecordOrder::IndexDescending)
            .await?
            .into_iter()
            .next();
        Ok(newest.map_or(FIRST_OVERFLOW_INDEX, |r| r.successor_index()))
    }

    /// The record owning `backup`, if `backup` is an overflow category.
    pub async fn find_backup(
        &self,
        backup: CategoryId,
    ) -> Result<Option<OverflowRecord>, LedgerError> {
        Ok(self.store.find(RecordQuery::Backup(backup)).await?)
    }

    /// Persist a new overflow record.
    ///
    /// `index` must exceed every index already recorded for `original`,
    /// and `backup` must not back any category yet. Existing records are
    /// never rewritten.
    pub async fn record(
        &self,
        original: CategoryId,
        backup: CategoryId,
        index: u32,
    ) -> Result<OverflowRecord, LedgerError> {
        if let Some(existing) = self.find_backup(backup).await? {
            return Err(LedgerError::BackupAlreadyTracked {
                backup,
                original: existing.original_category_id,
            });
        }

        let expected_floor = self.next_index(original).await?;
        if index < expected_floor {
            return Err(LedgerError::IndexNotIncreasing {
                original,
                index,
                current: expected_floor - 1,
            });
        }

        let record = OverflowRecord::new(original, backup, index);
        self.store.upsert(record.clone()).await?;
        info!(
            original = %original,
            backup = %backup,
            index,
            "recorded overflow category"
        );
        Ok(record)
    }

    /// Remove a record. Releasing an already-removed record is a no-op.
    pub async fn release(&self, record: &OverflowRecord) -> Result<(), LedgerError> {
        self.store.delete(record).await?;
        debug!(
            original = %record.original_category_id,
            backup = %record.backup_category_id,
            index = record.index,
            "released overflow record"
        );
        Ok(())
    }

    /// Every record, grouped by original category in index order.
    pub async fn all(&self) -> Result<Vec<OverflowRecord>, LedgerError> {
        Ok(self
            .store
            .find_all(RecordQuery::All, RecordOrder::IndexAscending)
            .await?)
    }

    /// Drop records whose backup category is absent from `live`.
    ///
    /// Returns the removed records.
    pub async fn reconcile(
        &self,
        live: &BTreeSet<CategoryId>,
    ) -> Result<Vec<OverflowRecord>, LedgerError> {
        let mut removed = Vec::new();
        for record in self.all().await? {
            if live.contains(&record.backup_category_id) {
                continue;
            }
            warn!(
                original = %record.original_category_id,
                backup = %record.backup_category_id,
                index = record.index,
                "backup category missing from topology, dropping record"
            );
            self.release(&record).await?;
            removed.push(record);
        }
        Ok(removed)
    }
}
