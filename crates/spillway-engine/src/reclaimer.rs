//! Overflow reclamation: delete a backup category once it is empty.

use serde::Serialize;
use spillway_kernel::{CategoryId, TopologyProvider};
use spillway_ledger::{OverflowLedger, OverflowRecord};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::PlacementError;
use crate::locks::CategoryLocks;

pub const RECLAIM_REASON: &str = "Removing unused backup category";

/// What [`OverflowReclaimer::on_channel_removed`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReclaimOutcome {
    /// The category was an empty overflow; record and category are gone.
    Reclaimed { record: OverflowRecord },
    /// The category is an overflow that still has children.
    NotEmpty { remaining: usize },
    /// The category is not an overflow (an original, or already reclaimed).
    Untracked,
}

#[derive(Clone)]
pub struct OverflowReclaimer {
    topology: Arc<dyn TopologyProvider>,
    ledger: OverflowLedger,
    locks: CategoryLocks,
}

impl std::fmt::Debug for OverflowReclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverflowReclaimer").finish_non_exhaustive()
    }
}

impl OverflowReclaimer {
    pub fn new(
        topology: Arc<dyn TopologyProvider>,
        ledger: OverflowLedger,
        locks: CategoryLocks,
    ) -> Self {
        Self {
            topology,
            ledger,
            locks,
        }
    }

    /// React to a channel leaving `category`.
    ///
    /// Original categories are never deleted. Repeated calls for the same
    /// category are no-ops once it has been reclaimed.
    pub async fn on_channel_removed(
        &self,
        category: CategoryId,
    ) -> Result<ReclaimOutcome, PlacementError> {
        let Some(record) = self.ledger.find_backup(category).await? else {
            debug!(category = %category, "not an overflow category");
            return Ok(ReclaimOutcome::Untracked);
        };

        // Serialize with allocations for the same original.
        let _guard = self.locks.acquire(record.original_category_id).await;

        // Re-read under the lock; a concurrent removal may have won.
        let Some(record) = self.ledger.find_backup(category).await? else {
            return Ok(ReclaimOutcome::Untracked);
        };

        let remaining = self.topology.child_count(category).await?;
        if remaining > 0 {
            debug!(category = %category, remaining, "overflow category still in use");
            return Ok(ReclaimOutcome::NotEmpty { remaining });
        }

        self.ledger.release(&record).await?;
        self.topology
            .delete_category(category, RECLAIM_REASON)
            .await?;
        info!(
            original = %record.original_category_id,
            backup = %category,
            index = record.index,
            "reclaimed overflow category"
        );
        Ok(ReclaimOutcome::Reclaimed { record })
    }
}
